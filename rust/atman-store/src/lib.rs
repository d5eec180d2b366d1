// atman-store: RDF data model and graph store
// Wraps oxigraph for Turtle/N3 ingest and SPARQL evaluation

pub mod canon;
pub mod delta;
pub mod error;
pub mod n3;
pub mod store;
pub mod triple;

pub use canon::{canonical_form, canonical_hash, isomorphic};
pub use delta::{QuadDelta, DEFAULT_BATCH_LIMIT};
pub use error::{StoreError, StoreResult};
pub use store::{GraphStore, Snapshot};
pub use triple::{LiteralValue, Node, Object, Triple};
