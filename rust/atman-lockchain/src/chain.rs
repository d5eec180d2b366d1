// rust/atman-lockchain/src/chain.rs
// The lockchain proper: an append-only total order of receipts, each
// linked to its predecessor's merkle root

use crate::receipt::Receipt;
use crate::storage::LockchainStorage;
use crate::{LockchainError, LockchainResult};
use rayon::prelude::*;
use std::path::Path;
use uuid::Uuid;

/// Predecessor hash of the first receipt
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A linkage or recomputation failure found by the verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainViolation {
    pub index: u64,
    pub detail: String,
}

enum Backend {
    Memory(Vec<Receipt>),
    Disk(LockchainStorage),
}

/// Append-only receipt chain. The in-memory backend serves embedded
/// use and tests; the disk backend persists the layout described in
/// `storage`.
pub struct Lockchain {
    backend: Backend,
    tip: String,
}

impl Lockchain {
    /// Chain held entirely in memory
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Vec::new()),
            tip: GENESIS_HASH.to_string(),
        }
    }

    /// Chain persisted under a directory; reopening resumes at the
    /// stored tip
    pub fn open(dir: impl AsRef<Path>) -> LockchainResult<Self> {
        let storage = LockchainStorage::open(dir)?;
        let tip = storage.tip()?.unwrap_or_else(|| GENESIS_HASH.to_string());
        Ok(Self {
            backend: Backend::Disk(storage),
            tip,
        })
    }

    /// Append a receipt. Its `prev_hash` must equal the current tip;
    /// on success the tip advances to the receipt's merkle root.
    pub fn append(&mut self, receipt: Receipt) -> LockchainResult<()> {
        if receipt.prev_hash != self.tip {
            return Err(LockchainError::TipMismatch {
                found: receipt.prev_hash,
                tip: self.tip.clone(),
            });
        }
        let new_tip = receipt.merkle_root.clone();
        match &mut self.backend {
            Backend::Memory(receipts) => receipts.push(receipt),
            Backend::Disk(storage) => {
                storage.append(&receipt)?;
            }
        }
        self.tip = new_tip;
        tracing::debug!(tip = %self.tip, "lockchain advanced");
        Ok(())
    }

    /// Current tip: the merkle root of the last receipt, or genesis
    pub fn tip(&self) -> &str {
        &self.tip
    }

    pub fn len(&self) -> u64 {
        match &self.backend {
            Backend::Memory(receipts) => receipts.len() as u64,
            Backend::Disk(storage) => storage.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch by chain position
    pub fn get(&self, index: u64) -> LockchainResult<Option<Receipt>> {
        match &self.backend {
            Backend::Memory(receipts) => Ok(receipts.get(index as usize).cloned()),
            Backend::Disk(storage) => storage.get(index),
        }
    }

    /// Fetch by transaction id
    pub fn get_by_tx(&self, tx_id: &Uuid) -> LockchainResult<Option<Receipt>> {
        match &self.backend {
            Backend::Memory(receipts) => {
                Ok(receipts.iter().find(|r| &r.tx_id == tx_id).cloned())
            }
            Backend::Disk(storage) => storage.get_by_tx(tx_id),
        }
    }

    /// All receipts in commit order
    pub fn receipts(&self) -> LockchainResult<Vec<Receipt>> {
        match &self.backend {
            Backend::Memory(receipts) => Ok(receipts.clone()),
            Backend::Disk(storage) => storage.read_all(),
        }
    }

    /// Export the chain as canonical JSON lines
    pub fn export(&self) -> LockchainResult<String> {
        let mut out = String::new();
        for receipt in self.receipts()? {
            out.push_str(&receipt.canonical_json()?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Independent verification: recompute every merkle root from the
    /// stored prev hash and canonical delta hashes (in parallel), then
    /// walk the linkage from genesis. An empty result means the chain
    /// is intact.
    pub fn verify(&self) -> LockchainResult<Vec<ChainViolation>> {
        let receipts = self.receipts()?;
        let mut violations: Vec<ChainViolation> = receipts
            .par_iter()
            .enumerate()
            .filter_map(|(index, receipt)| {
                let recomputed = receipt.recompute_merkle_root();
                if recomputed != receipt.merkle_root {
                    Some(ChainViolation {
                        index: index as u64,
                        detail: format!(
                            "merkle root mismatch: recomputed {recomputed}, stored {}",
                            receipt.merkle_root
                        ),
                    })
                } else {
                    None
                }
            })
            .collect();

        let mut expected = GENESIS_HASH.to_string();
        for (index, receipt) in receipts.iter().enumerate() {
            if receipt.prev_hash != expected {
                violations.push(ChainViolation {
                    index: index as u64,
                    detail: format!(
                        "broken link: prev_hash {} does not match predecessor root {expected}",
                        receipt.prev_hash
                    ),
                });
            }
            expected = receipt.merkle_root.clone();
        }

        violations.sort_by_key(|v| v.index);
        Ok(violations)
    }
}
