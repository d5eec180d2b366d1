// rust/atman-lockchain/src/lib.rs
// Append-only, hash-chained receipt log with Merkle batch anchors

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod chain;
pub mod merkle;
pub mod receipt;
pub mod storage;

pub use chain::{ChainViolation, Lockchain, GENESIS_HASH};
pub use merkle::{AnchorProof, BatchAnchor};
pub use receipt::{Receipt, ReceiptBuilder, ReceiptKind};
pub use storage::LockchainStorage;

use thiserror::Error;

/// Top-level lockchain errors
#[derive(Debug, Error)]
pub enum LockchainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("receipt prev_hash {found} does not extend tip {tip}")]
    TipMismatch { found: String, tip: String },

    #[error("corrupt log record at offset {offset}: {detail}")]
    CorruptRecord { offset: u64, detail: String },
}

impl From<serde_json::Error> for LockchainError {
    fn from(e: serde_json::Error) -> Self {
        LockchainError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for LockchainError {
    fn from(e: bincode::Error) -> Self {
        LockchainError::Serialization(e.to_string())
    }
}

/// Result type for lockchain operations
pub type LockchainResult<T> = Result<T, LockchainError>;
