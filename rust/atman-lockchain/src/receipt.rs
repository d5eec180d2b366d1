// Immutable transaction and tick receipts with canonical JSON
// serialization (sorted keys, decimal integers, lowercase hex)

use crate::{LockchainError, LockchainResult};
use atman_hooks::{HookResult, SanitizedError};
use atman_store::canon::{canonical_hash, sha256_hex};
use atman_store::Triple;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What produced the receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptKind {
    Mutation,
    Tick,
}

/// Immutable record of one transaction or one reasoning tick. The
/// canonical JSON form of a receipt is the pre-image for any hash of
/// it and the storage format of the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_id: Uuid,
    pub kind: ReceiptKind,
    pub actor: String,
    pub timestamp_ns: u64,
    /// Tip of the chain when this receipt was produced
    pub prev_hash: String,
    /// `sha256(prev_hash | additions_hash | removals_hash)`
    pub merkle_root: String,
    /// Digest of the hook set active at receipt time
    pub logic_hash: String,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SanitizedError>,
    pub duration_ns: u64,
    pub additions_count: u64,
    pub removals_count: u64,
    /// SHA-256 of the canonical (sorted) addition list
    pub additions_hash: String,
    /// SHA-256 of the canonical (sorted) removal list
    pub removals_hash: String,
    pub hook_results: Vec<HookResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triples_before: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triples_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_triples: Option<u64>,
}

impl Receipt {
    /// Canonical serialization: JSON with lexicographically sorted
    /// keys. Byte-stable across serialize/parse/serialize cycles.
    pub fn canonical_json(&self) -> LockchainResult<String> {
        let value = serde_json::to_value(self)?;
        Ok(value.to_string())
    }

    /// Parse a receipt back from its canonical form
    pub fn from_canonical_json(bytes: &[u8]) -> LockchainResult<Self> {
        serde_json::from_slice(bytes).map_err(LockchainError::from)
    }

    /// SHA-256 of the canonical serialization
    pub fn receipt_hash(&self) -> LockchainResult<String> {
        Ok(sha256_hex(self.canonical_json()?.as_bytes()))
    }

    /// Recompute the merkle root from the stored fields; an
    /// independent verifier compares this against `merkle_root`
    pub fn recompute_merkle_root(&self) -> String {
        chain_hash(&self.prev_hash, &self.additions_hash, &self.removals_hash)
    }
}

/// `sha256(prev | "|" | additions_hash | "|" | removals_hash)`
pub fn chain_hash(prev_hash: &str, additions_hash: &str, removals_hash: &str) -> String {
    sha256_hex(format!("{prev_hash}|{additions_hash}|{removals_hash}").as_bytes())
}

/// Assembles a receipt, computing the delta hashes and merkle root at
/// build time. Everything else is recorded verbatim.
pub struct ReceiptBuilder {
    kind: ReceiptKind,
    tx_id: Uuid,
    actor: String,
    timestamp_ns: u64,
    prev_hash: String,
    logic_hash: String,
    committed: bool,
    error: Option<SanitizedError>,
    duration_ns: u64,
    additions: Vec<Triple>,
    removals: Vec<Triple>,
    hook_results: Vec<HookResult>,
    tick_number: Option<u64>,
    triples_before: Option<u64>,
    triples_after: Option<u64>,
    delta_triples: Option<u64>,
}

impl ReceiptBuilder {
    pub fn new(kind: ReceiptKind, tx_id: Uuid, actor: impl Into<String>) -> Self {
        Self {
            kind,
            tx_id,
            actor: actor.into(),
            timestamp_ns: 0,
            prev_hash: String::new(),
            logic_hash: String::new(),
            committed: false,
            error: None,
            duration_ns: 0,
            additions: Vec::new(),
            removals: Vec::new(),
            hook_results: Vec::new(),
            tick_number: None,
            triples_before: None,
            triples_after: None,
            delta_triples: None,
        }
    }

    pub fn timestamp_ns(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    pub fn prev_hash(mut self, prev_hash: impl Into<String>) -> Self {
        self.prev_hash = prev_hash.into();
        self
    }

    pub fn logic_hash(mut self, logic_hash: impl Into<String>) -> Self {
        self.logic_hash = logic_hash.into();
        self
    }

    pub fn committed(mut self, committed: bool) -> Self {
        self.committed = committed;
        self
    }

    pub fn error(mut self, error: SanitizedError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn duration_ns(mut self, duration_ns: u64) -> Self {
        self.duration_ns = duration_ns;
        self
    }

    pub fn additions(mut self, additions: Vec<Triple>) -> Self {
        self.additions = additions;
        self
    }

    pub fn removals(mut self, removals: Vec<Triple>) -> Self {
        self.removals = removals;
        self
    }

    pub fn hook_results(mut self, hook_results: Vec<HookResult>) -> Self {
        self.hook_results = hook_results;
        self
    }

    pub fn tick(
        mut self,
        tick_number: u64,
        triples_before: u64,
        triples_after: u64,
        delta_triples: u64,
    ) -> Self {
        self.tick_number = Some(tick_number);
        self.triples_before = Some(triples_before);
        self.triples_after = Some(triples_after);
        self.delta_triples = Some(delta_triples);
        self
    }

    /// Freeze the receipt, deriving the canonical delta hashes and the
    /// merkle root
    pub fn build(self) -> Receipt {
        let additions_hash = canonical_hash(&self.additions);
        let removals_hash = canonical_hash(&self.removals);
        let merkle_root = chain_hash(&self.prev_hash, &additions_hash, &removals_hash);
        Receipt {
            tx_id: self.tx_id,
            kind: self.kind,
            actor: self.actor,
            timestamp_ns: self.timestamp_ns,
            prev_hash: self.prev_hash,
            merkle_root,
            logic_hash: self.logic_hash,
            committed: self.committed,
            error: self.error,
            duration_ns: self.duration_ns,
            additions_count: self.additions.len() as u64,
            removals_count: self.removals.len() as u64,
            additions_hash,
            removals_hash,
            hook_results: self.hook_results,
            tick_number: self.tick_number,
            triples_before: self.triples_before,
            triples_after: self.triples_after,
            delta_triples: self.delta_triples,
        }
    }
}
