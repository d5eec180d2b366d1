// Error types for hook and condition evaluation

use thiserror::Error;

/// Error types for hook and condition evaluation. Handler-raised
/// variants are caught by the executor and sanitized; they never cross
/// the receipt boundary raw.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook failed: {0}")]
    Failed(String),
    #[error("sandbox breach: {0}")]
    SandboxBreach(String),
    #[error("invalid hook definition: {0}")]
    InvalidDefinition(String),
    #[error(transparent)]
    Store(#[from] atman_store::StoreError),
}

/// Result type for hook operations
pub type HooksResult<T> = Result<T, HookError>;
