// Error types for rule compilation and reasoning

use thiserror::Error;

/// Error types for rule compilation and reasoning
#[derive(Debug, Error)]
pub enum ReasonError {
    #[error("unsafe rule {id}: head variable ?{variable} is not bound in the body")]
    UnsafeRule { id: String, variable: String },
    #[error("strict tick {tick} had {failed} failing rule(s)")]
    StrictTick { tick: u64, failed: u64 },
    #[error(transparent)]
    Store(#[from] atman_store::StoreError),
}

/// Result type for reasoning operations
pub type ReasonResult<T> = Result<T, ReasonError>;
