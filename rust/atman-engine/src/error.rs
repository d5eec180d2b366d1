// Engine-level error type: a thin umbrella over the member crates

use thiserror::Error;

/// Errors surfaced by engine operations. Transaction-level failures
/// (guard vetoes, oversize deltas) are not errors — they come back as
/// receipts with `committed = false`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] atman_store::StoreError),
    #[error(transparent)]
    Reason(#[from] atman_reason::ReasonError),
    #[error(transparent)]
    Lockchain(#[from] atman_lockchain::LockchainError),
    #[error(transparent)]
    Config(#[from] atman_config::ConfigError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
