// Hook model: modes, sandbox limits, invocation context and results

use crate::error::HookError;
use crate::sanitize::SanitizedError;
use crate::view::StoreView;
use atman_store::QuadDelta;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// When a hook runs relative to the state mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HookMode {
    /// Guard: a failing PRE hook vetoes the transaction
    Pre,
    /// Observer: POST hooks see the committed delta, cannot veto
    Post,
}

impl std::fmt::Display for HookMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookMode::Pre => write!(f, "PRE"),
            HookMode::Post => write!(f, "POST"),
        }
    }
}

/// Resource limits for one hook invocation. The wall clock is enforced
/// by the executor; the remaining limits are declared capabilities a
/// cooperating handler honors and reports breaches against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    pub cpu_ms: u64,
    pub wall_ms: u64,
    pub heap_bytes: u64,
    pub max_file_handles: u32,
    pub allow_network: bool,
    pub allow_subprocess: bool,
    pub path_allowlist: BTreeSet<String>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            cpu_ms: 1_000,
            wall_ms: 2_000,
            heap_bytes: 64 * 1024 * 1024,
            max_file_handles: 8,
            allow_network: false,
            allow_subprocess: false,
            path_allowlist: BTreeSet::new(),
        }
    }
}

/// Per-invocation context, immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    pub tx_id: Uuid,
    pub actor: String,
    pub timestamp_ns: u64,
    pub prev_tip_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl HookContext {
    pub fn new(actor: impl Into<String>, timestamp_ns: u64, prev_tip_hash: impl Into<String>) -> Self {
        Self {
            tx_id: Uuid::new_v4(),
            actor: actor.into(),
            timestamp_ns,
            prev_tip_hash: prev_tip_hash.into(),
            request_id: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// What a handler returns when it completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl HookOutcome {
    pub fn pass() -> Self {
        Self {
            success: true,
            output: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            success: false,
            output: None,
        }
    }

    pub fn pass_with(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output: Some(output),
        }
    }
}

/// The uniform handler capability: read-only store view, the pending
/// (PRE) or committed (POST) delta, and the invocation context.
pub trait HookHandler: Send + Sync {
    fn invoke(
        &self,
        view: &StoreView,
        delta: &QuadDelta,
        context: &HookContext,
    ) -> Result<HookOutcome, HookError>;
}

impl<F> HookHandler for F
where
    F: Fn(&StoreView, &QuadDelta, &HookContext) -> Result<HookOutcome, HookError> + Send + Sync,
{
    fn invoke(
        &self,
        view: &StoreView,
        delta: &QuadDelta,
        context: &HookContext,
    ) -> Result<HookOutcome, HookError> {
        self(view, delta, context)
    }
}

/// A registered hook. Identity for equality and hashing is
/// `(id, mode, priority)`; the handler is an opaque capability.
#[derive(Clone)]
pub struct Hook {
    pub id: String,
    pub mode: HookMode,
    pub priority: u8,
    pub handler: Arc<dyn HookHandler>,
    pub timeout_ms: u64,
    pub sandbox: SandboxLimits,
}

impl Hook {
    pub fn new(id: impl Into<String>, mode: HookMode, handler: Arc<dyn HookHandler>) -> Self {
        Self {
            id: id.into(),
            mode,
            priority: 0,
            handler,
            timeout_ms: 2_000,
            sandbox: SandboxLimits::default(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_sandbox(mut self, sandbox: SandboxLimits) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// The wall budget the executor enforces: the tighter of the hook
    /// timeout and the sandbox wall clock
    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout_ms.min(self.sandbox.wall_ms)
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.mode == other.mode && self.priority == other.priority
    }
}

impl Eq for Hook {}

impl Hash for Hook {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.mode.hash(state);
        self.priority.hash(state);
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("priority", &self.priority)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// The executor's record of one hook invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResult {
    pub hook_id: String,
    pub success: bool,
    pub duration_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SanitizedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}
