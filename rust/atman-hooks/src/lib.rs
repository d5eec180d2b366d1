// atman-hooks: condition evaluation and lifecycle pipeline for the
// mutation engine and the reasoning loop

pub mod cache;
pub mod condition;
pub mod error;
pub mod executor;
pub mod registry;
pub mod sanitize;
pub mod shacl;
pub mod types;
pub mod view;

pub use cache::{CacheStats, ConditionCache};
pub use condition::{
    Aggregate, BoolOp, CmpOp, Condition, ConditionEvaluator, ConditionPayload, ConditionResult,
    DeltaMetric,
};
pub use error::{HookError, HooksResult};
pub use executor::{execute_hook, execute_hooks};
pub use registry::HookRegistry;
pub use sanitize::{kind, sanitize_message, SanitizedError};
pub use shacl::{validate_shapes, ShaclViolation, ValidationReport};
pub use types::{Hook, HookContext, HookHandler, HookMode, HookOutcome, HookResult, SandboxLimits};
pub use view::StoreView;
