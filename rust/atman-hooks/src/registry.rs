// Ordered hook registry with a deterministic logic hash over the
// active hook set

use crate::types::{Hook, HookMode};
use atman_store::canon::sha256_hex;

/// Ordered set of hooks indexed by id. Evaluation order is priority
/// descending, then id ascending. Every membership change recomputes
/// the logic hash embedded in receipts.
pub struct HookRegistry {
    hooks: Vec<Hook>,
    logic_hash: String,
}

impl HookRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            hooks: Vec::new(),
            logic_hash: String::new(),
        };
        registry.recompute();
        registry
    }

    /// Register a hook; false when a hook with the same id exists
    pub fn register(&mut self, hook: Hook) -> bool {
        if self.hooks.iter().any(|h| h.id == hook.id) {
            tracing::warn!(hook = %hook.id, "duplicate hook id rejected");
            return false;
        }
        self.hooks.push(hook);
        self.hooks
            .sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        self.recompute();
        true
    }

    /// Unregister by id; false when no such hook exists
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.id != id);
        if self.hooks.len() == before {
            return false;
        }
        self.recompute();
        true
    }

    pub fn get(&self, id: &str) -> Option<&Hook> {
        self.hooks.iter().find(|h| h.id == id)
    }

    /// PRE hooks in evaluation order
    pub fn pre_hooks(&self) -> impl Iterator<Item = &Hook> {
        self.hooks.iter().filter(|h| h.mode == HookMode::Pre)
    }

    /// POST hooks in evaluation order
    pub fn post_hooks(&self) -> impl Iterator<Item = &Hook> {
        self.hooks.iter().filter(|h| h.mode == HookMode::Post)
    }

    /// Digest over the sorted `(id, mode, priority)` tuples of every
    /// registered hook; stable under registration order
    pub fn logic_hash(&self) -> &str {
        &self.logic_hash
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn recompute(&mut self) {
        let mut lines: Vec<String> = self
            .hooks
            .iter()
            .map(|h| format!("{}|{}|{}", h.id, h.mode, h.priority))
            .collect();
        lines.sort();
        self.logic_hash = sha256_hex(lines.join("\n").as_bytes());
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HookContext, HookHandler, HookOutcome};
    use crate::view::StoreView;
    use atman_store::QuadDelta;
    use std::sync::Arc;

    fn noop() -> Arc<dyn HookHandler> {
        Arc::new(|_: &StoreView, _: &QuadDelta, _: &HookContext| Ok(HookOutcome::pass()))
    }

    fn hook(id: &str, mode: HookMode, priority: u8) -> Hook {
        Hook::new(id, mode, noop()).with_priority(priority)
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = HookRegistry::new();
        assert!(registry.register(hook("a", HookMode::Pre, 0)));
        assert!(!registry.register(hook("a", HookMode::Post, 5)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_evaluation_order_priority_desc_then_id_asc() {
        let mut registry = HookRegistry::new();
        registry.register(hook("charlie", HookMode::Pre, 1));
        registry.register(hook("bravo", HookMode::Pre, 9));
        registry.register(hook("alpha", HookMode::Pre, 1));

        let order: Vec<&str> = registry.pre_hooks().map(|h| h.id.as_str()).collect();
        assert_eq!(order, vec!["bravo", "alpha", "charlie"]);
    }

    #[test]
    fn test_modes_are_partitioned() {
        let mut registry = HookRegistry::new();
        registry.register(hook("guard", HookMode::Pre, 0));
        registry.register(hook("audit", HookMode::Post, 0));

        assert_eq!(registry.pre_hooks().count(), 1);
        assert_eq!(registry.post_hooks().count(), 1);
        assert_eq!(registry.pre_hooks().next().unwrap().id, "guard");
        assert_eq!(registry.post_hooks().next().unwrap().id, "audit");
    }

    #[test]
    fn test_logic_hash_changes_with_membership() {
        let mut registry = HookRegistry::new();
        let empty = registry.logic_hash().to_string();

        registry.register(hook("a", HookMode::Pre, 0));
        let with_a = registry.logic_hash().to_string();
        assert_ne!(empty, with_a);

        registry.register(hook("b", HookMode::Post, 3));
        assert_ne!(with_a, registry.logic_hash());
    }

    #[test]
    fn test_register_unregister_restores_hash() {
        let mut registry = HookRegistry::new();
        registry.register(hook("a", HookMode::Pre, 0));
        let before = registry.logic_hash().to_string();

        registry.register(hook("b", HookMode::Post, 3));
        assert!(registry.unregister("b"));
        assert_eq!(registry.logic_hash(), before);
    }

    #[test]
    fn test_logic_hash_stable_under_registration_order() {
        let mut forward = HookRegistry::new();
        forward.register(hook("a", HookMode::Pre, 1));
        forward.register(hook("b", HookMode::Post, 2));
        forward.register(hook("c", HookMode::Pre, 3));

        let mut reverse = HookRegistry::new();
        reverse.register(hook("c", HookMode::Pre, 3));
        reverse.register(hook("a", HookMode::Pre, 1));
        reverse.register(hook("b", HookMode::Post, 2));

        assert_eq!(forward.logic_hash(), reverse.logic_hash());
    }

    #[test]
    fn test_unregister_missing_is_false() {
        let mut registry = HookRegistry::new();
        assert!(!registry.unregister("ghost"));
    }
}
