// atman-engine: the hybrid facade over store, reasoner, hooks and
// lockchain. One engine instance owns the store, the hook registry,
// the compiled rule set and the receipt chain.

pub mod engine;
pub mod error;
pub mod status;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use status::{StatusInspector, TaskStatus};

// The surface a caller needs, re-exported from the member crates
pub use atman_config::{AtmanConfig, EngineConfig, SandboxConfig};
pub use atman_hooks::{
    Condition, ConditionResult, Hook, HookContext, HookMode, HookOutcome, HookResult,
    SandboxLimits, StoreView,
};
pub use atman_lockchain::{Lockchain, Receipt, ReceiptKind, GENESIS_HASH};
pub use atman_reason::{Run, TickResult};
pub use atman_store::{Node, Object, QuadDelta, Triple};
