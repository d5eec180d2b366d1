// Read-only store capability handed to hook handlers and the
// condition evaluator. Mutation goes through the engine's apply path,
// never through a view.

use atman_store::{GraphStore, StoreResult, Triple};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Read-only graph handle supporting ASK, SELECT and CONSTRUCT
#[derive(Clone)]
pub struct StoreView {
    store: Arc<GraphStore>,
}

impl StoreView {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    pub fn ask(&self, query: &str) -> StoreResult<bool> {
        self.store.ask(query)
    }

    pub fn select(&self, query: &str) -> StoreResult<Vec<BTreeMap<String, String>>> {
        self.store.select(query)
    }

    pub fn construct(&self, query: &str) -> StoreResult<BTreeSet<Triple>> {
        self.store.construct(query)
    }

    pub fn triple_count(&self) -> StoreResult<usize> {
        self.store.triple_count()
    }
}
