// Bounded, immutable batches of triple additions and removals

use crate::error::{StoreError, StoreResult};
use crate::triple::Triple;
use serde::{Deserialize, Serialize};

/// Maximum triples per delta (additions + removals)
pub const DEFAULT_BATCH_LIMIT: usize = 64;

/// A bounded batch of additions and removals, immutable after
/// construction. Constructing a batch larger than the limit fails with
/// a topology violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadDelta {
    additions: Vec<Triple>,
    removals: Vec<Triple>,
}

impl QuadDelta {
    /// Build a delta under the default batch limit
    pub fn new(additions: Vec<Triple>, removals: Vec<Triple>) -> StoreResult<Self> {
        Self::with_limit(additions, removals, DEFAULT_BATCH_LIMIT)
    }

    /// Build a delta under an explicit batch limit
    pub fn with_limit(
        additions: Vec<Triple>,
        removals: Vec<Triple>,
        limit: usize,
    ) -> StoreResult<Self> {
        let size = additions.len() + removals.len();
        if size > limit {
            return Err(StoreError::TopologyViolation { size, limit });
        }
        Ok(Self {
            additions,
            removals,
        })
    }

    /// Additions-only convenience constructor
    pub fn additions_only(additions: Vec<Triple>) -> StoreResult<Self> {
        Self::new(additions, Vec::new())
    }

    pub fn additions(&self) -> &[Triple] {
        &self.additions
    }

    pub fn removals(&self) -> &[Triple] {
        &self.removals
    }

    /// Total triples in the batch
    pub fn len(&self) -> usize {
        self.additions.len() + self.removals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// The inverse delta: additions and removals swapped. Applying a
    /// delta and then its inverse restores the original triple count.
    pub fn inverse(&self) -> Self {
        Self {
            additions: self.removals.clone(),
            removals: self.additions.clone(),
        }
    }
}
