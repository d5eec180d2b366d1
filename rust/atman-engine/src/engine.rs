// The mutation engine and hybrid facade. One instance owns the store,
// the compiled rule set, the hook registry, the condition cache and
// the receipt chain; `apply` and `tick` are the only write paths and
// both are serialized behind the writer lock.

use crate::error::{EngineError, EngineResult};
use crate::status::{StatusInspector, TaskStatus};
use atman_config::{AtmanConfig, EngineConfig};
use atman_hooks::{
    execute_hooks, kind, CacheStats, Condition, ConditionEvaluator, ConditionResult, Hook,
    HookContext, HookRegistry, HookResult, SandboxLimits, SanitizedError, StoreView,
};
use atman_lockchain::{ChainViolation, Lockchain, Receipt, ReceiptBuilder, ReceiptKind};
use atman_reason::{compile_rules, CompiledRule, ReasonError, RejectedRule, Run, TickResult};
use atman_store::{GraphStore, QuadDelta, Triple};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Logic {
    rules: Vec<CompiledRule>,
    rejected: Vec<RejectedRule>,
}

/// The hybrid workflow-knowledge engine. Readers (queries, inspection,
/// receipt lookup) run concurrently; `apply` and `tick` are
/// writer-exclusive, so committed transactions form a total order and
/// the lockchain index is the commit order.
pub struct Engine {
    config: EngineConfig,
    store: Arc<GraphStore>,
    logic: RwLock<Logic>,
    registry: RwLock<HookRegistry>,
    chain: Mutex<Lockchain>,
    evaluator: ConditionEvaluator,
    inspector: StatusInspector,
    store_version: AtomicU64,
    tick_counter: AtomicU64,
    rw: RwLock<()>,
}

impl Engine {
    /// Build an engine from configuration. A configured lockchain
    /// directory makes receipts durable; otherwise the chain lives in
    /// memory.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        atman_config::validate_config(&AtmanConfig {
            engine: config.clone(),
        })?;
        let chain = match &config.lockchain_dir {
            Some(dir) => Lockchain::open(dir)?,
            None => Lockchain::in_memory(),
        };
        Ok(Self {
            store: Arc::new(GraphStore::new()?),
            logic: RwLock::new(Logic {
                rules: Vec::new(),
                rejected: Vec::new(),
            }),
            registry: RwLock::new(HookRegistry::new()),
            chain: Mutex::new(chain),
            evaluator: ConditionEvaluator::new(
                config.cache_capacity,
                Duration::from_millis(config.cache_ttl_ms),
            ),
            inspector: StatusInspector::new(&config.status_predicate),
            store_version: AtomicU64::new(0),
            tick_counter: AtomicU64::new(0),
            rw: RwLock::new(()),
            config,
        })
    }

    /// Engine with default configuration and an in-memory chain
    pub fn with_defaults() -> EngineResult<Self> {
        Self::new(EngineConfig::default())
    }

    // ------------------------------------------------------------------
    // Loading

    /// Compile the implications of an N3 document into the rule set
    /// and ingest its fact portion. Returns the number of rules added;
    /// unsafe rules are omitted and reported via `rejected_rules`.
    pub fn load_ontology(&self, text: &str) -> EngineResult<usize> {
        let _tx = self.rw.write();
        let set = compile_rules(text)?;
        let facts = atman_store::n3::strip_implications(text)?;
        if self.store.load_turtle(&facts)? > 0 {
            self.store_version.fetch_add(1, Ordering::SeqCst);
        }
        let added = set.rules.len();
        let mut logic = self.logic.write();
        logic.rules.extend(set.rules);
        logic.rejected.extend(set.rejected);
        tracing::info!(rules = added, rejected = logic.rejected.len(), "ontology loaded");
        Ok(added)
    }

    /// Ingest Turtle facts; returns the number of new triples
    pub fn load_topology(&self, text: &str) -> EngineResult<usize> {
        let _tx = self.rw.write();
        let loaded = self.store.load_turtle(text)?;
        if loaded > 0 {
            self.store_version.fetch_add(1, Ordering::SeqCst);
        }
        Ok(loaded)
    }

    /// Rules the compiler refused, with reasons
    pub fn rejected_rules(&self) -> Vec<RejectedRule> {
        self.logic.read().rejected.clone()
    }

    // ------------------------------------------------------------------
    // Mutation path

    /// Apply a delta transactionally: validate, run PRE guards in
    /// registry order, commit or roll back, run POST observers, seal a
    /// hash-chained receipt. Every call produces a receipt — inspect
    /// `committed` to learn whether state advanced. An `Err` means the
    /// engine itself failed (storage, chain), not the transaction.
    pub fn apply(&self, delta: &QuadDelta, actor: &str) -> EngineResult<Receipt> {
        let started = Instant::now();
        let _tx = self.rw.write();

        let context = self.fresh_context(actor);

        if delta.len() > self.config.batch_limit {
            let error = SanitizedError::new(
                kind::TOPOLOGY_VIOLATION,
                &format!(
                    "delta of {} triples exceeds batch limit {}",
                    delta.len(),
                    self.config.batch_limit
                ),
            );
            return self.seal(context, delta, false, Some(error), Vec::new(), started);
        }
        if delta.is_empty() {
            let error = SanitizedError::new(kind::EMPTY_DELTA, "delta carries no triples");
            return self.seal(context, delta, false, Some(error), Vec::new(), started);
        }

        let token = self.store.snapshot()?;
        let view = StoreView::new(self.store.clone());

        let registry = self.registry.read();
        let mut hook_results = execute_hooks(registry.pre_hooks(), &view, delta, &context, true);
        drop(registry);

        let mut committed = false;
        let mut error: Option<SanitizedError> = None;

        if let Some(vetoed) = hook_results.iter().find(|r| !r.success).cloned() {
            // Guard failure before any mutation; the snapshot is unused
            error = Some(match vetoed.error {
                Some(raised) => raised,
                None => SanitizedError::for_hook(
                    kind::GUARD_VIOLATION,
                    "guard hook vetoed the transaction",
                    &vetoed.hook_id,
                ),
            });
            tracing::warn!(tx = %context.tx_id, "transaction vetoed by guard");
        } else {
            match self.commit_delta(delta) {
                Ok(()) => {
                    committed = true;
                    self.store_version.fetch_add(1, Ordering::SeqCst);

                    let registry = self.registry.read();
                    let post_results =
                        execute_hooks(registry.post_hooks(), &view, delta, &context, false);
                    drop(registry);
                    if let Some(failed) = post_results.iter().find(|r| !r.success) {
                        let reason = failed
                            .error
                            .as_ref()
                            .map(|e| e.reason.clone())
                            .unwrap_or_else(|| "post hook reported failure".to_string());
                        error = Some(SanitizedError::for_hook(
                            kind::POST_HOOK_ERROR,
                            &reason,
                            &failed.hook_id,
                        ));
                    }
                    hook_results.extend(post_results);
                }
                Err(e) => {
                    self.store.restore(&token)?;
                    error = Some(SanitizedError::new(kind::STORE_ERROR, &e.to_string()));
                    tracing::error!(tx = %context.tx_id, error = %e, "commit failed, rolled back");
                }
            }
        }

        self.seal(context, delta, committed, error, hook_results, started)
    }

    fn commit_delta(&self, delta: &QuadDelta) -> EngineResult<()> {
        for triple in delta.removals() {
            self.store.remove(triple)?;
        }
        for triple in delta.additions() {
            self.store.insert(triple)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reasoning path

    /// One fixed-point step over the compiled rules. The produced
    /// triples become the addition set of a tick receipt; POST hooks
    /// observe them. Rules never remove.
    pub fn tick(&self) -> EngineResult<TickResult> {
        let started = Instant::now();
        let _tx = self.rw.write();

        let number = self.tick_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let context = self.fresh_context("engine");

        let logic = self.logic.read();
        let output = atman_reason::tick(&self.store, &logic.rules, number)?;
        drop(logic);

        if output.result.delta > 0 {
            self.store_version.fetch_add(1, Ordering::SeqCst);
        }

        let produced: Vec<Triple> = output.produced.into_iter().collect();
        let produced_len = produced.len();
        let delta = QuadDelta::with_limit(produced, Vec::new(), produced_len.max(1))?;

        let view = StoreView::new(self.store.clone());
        let registry = self.registry.read();
        let post_results = execute_hooks(registry.post_hooks(), &view, &delta, &context, false);
        drop(registry);

        let error = post_results.iter().find(|r| !r.success).map(|failed| {
            let reason = failed
                .error
                .as_ref()
                .map(|e| e.reason.clone())
                .unwrap_or_else(|| "post hook reported failure".to_string());
            SanitizedError::for_hook(kind::POST_HOOK_ERROR, &reason, &failed.hook_id)
        });

        let result = output.result;
        self.seal_tick(context, delta, error, post_results, result, started)?;
        Ok(result)
    }

    /// Repeat ticks until fixed point or budget exhaustion
    /// (`converged = false`). With `strict_tick` configured, the first
    /// tick with failing rules aborts the run.
    pub fn run_to_completion(&self, max_ticks: Option<u64>) -> EngineResult<Run> {
        let budget = max_ticks.unwrap_or(self.config.max_ticks);
        let mut ticks = Vec::new();
        for _ in 0..budget {
            let result = self.tick()?;
            let delta = result.delta;
            let failed = result.rules_failed;
            let number = result.tick_number;
            ticks.push(result);
            if self.config.strict_tick && failed > 0 {
                return Err(EngineError::Reason(ReasonError::StrictTick {
                    tick: number,
                    failed,
                }));
            }
            if delta == 0 {
                return Ok(Run {
                    ticks,
                    converged: true,
                });
            }
        }
        tracing::warn!(budget, "run_to_completion exhausted its tick budget");
        Ok(Run {
            ticks,
            converged: false,
        })
    }

    // ------------------------------------------------------------------
    // Hooks and conditions

    /// Register a hook; hooks without an explicit timeout inherit the
    /// configured default. False when the id is already taken.
    pub fn register_hook(&self, mut hook: Hook) -> bool {
        if hook.timeout_ms == 0 {
            hook.timeout_ms = self.config.hook_default_timeout_ms;
        }
        self.registry.write().register(hook)
    }

    pub fn unregister_hook(&self, id: &str) -> bool {
        self.registry.write().unregister(id)
    }

    /// Digest of the active hook set, as embedded in receipts
    pub fn logic_hash(&self) -> String {
        self.registry.read().logic_hash().to_string()
    }

    /// Evaluate a condition against the current store state, with
    /// caching keyed by the store version
    pub fn evaluate_condition(&self, condition: &Condition) -> ConditionResult {
        let _read = self.rw.read();
        self.evaluator.evaluate(
            condition,
            &StoreView::new(self.store.clone()),
            self.store_version.load(Ordering::SeqCst),
        )
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.evaluator.cache_stats()
    }

    /// Drop every cached condition result
    pub fn clear_condition_cache(&self) {
        self.evaluator.clear_cache()
    }

    /// Sandbox limits seeded from configuration, for hooks that do
    /// not declare their own
    pub fn default_sandbox(&self) -> SandboxLimits {
        SandboxLimits {
            cpu_ms: self.config.sandbox.cpu_ms,
            wall_ms: self.config.sandbox.wall_ms,
            heap_bytes: self.config.sandbox.heap_bytes,
            max_file_handles: self.config.sandbox.max_file_handles,
            allow_network: self.config.sandbox.allow_network,
            allow_subprocess: self.config.sandbox.allow_subprocess,
            path_allowlist: Default::default(),
        }
    }

    // ------------------------------------------------------------------
    // Inspection

    /// Effective status per task, resolved by priority over the
    /// monotonic store
    pub fn inspect_state(&self) -> EngineResult<BTreeMap<String, TaskStatus>> {
        let _read = self.rw.read();
        Ok(self.inspector.inspect(&self.store)?)
    }

    /// Tasks whose effective status is Active
    pub fn get_active_tasks(&self) -> EngineResult<BTreeSet<String>> {
        let _read = self.rw.read();
        Ok(self.inspector.active_tasks(&self.store)?)
    }

    pub fn triple_count(&self) -> EngineResult<usize> {
        let _read = self.rw.read();
        Ok(self.store.triple_count()?)
    }

    /// Monotonic counter bumped by every committed mutation and every
    /// productive tick; condition cache entries are keyed by it
    pub fn store_version(&self) -> u64 {
        self.store_version.load(Ordering::SeqCst)
    }

    pub fn dump_store(&self) -> EngineResult<String> {
        let _read = self.rw.read();
        Ok(self.store.dump_turtle()?)
    }

    // ------------------------------------------------------------------
    // Chain access

    /// Current chain tip (merkle root of the last receipt)
    pub fn tip(&self) -> String {
        self.chain.lock().tip().to_string()
    }

    pub fn chain_len(&self) -> u64 {
        self.chain.lock().len()
    }

    /// Receipt lookup by transaction id
    pub fn receipt(&self, tx_id: &Uuid) -> EngineResult<Option<Receipt>> {
        Ok(self.chain.lock().get_by_tx(tx_id)?)
    }

    /// All receipts in commit order
    pub fn receipts(&self) -> EngineResult<Vec<Receipt>> {
        Ok(self.chain.lock().receipts()?)
    }

    /// Walk the chain from genesis, recomputing every merkle root
    pub fn verify_chain(&self) -> EngineResult<Vec<ChainViolation>> {
        Ok(self.chain.lock().verify()?)
    }

    // ------------------------------------------------------------------

    fn fresh_context(&self, actor: &str) -> HookContext {
        HookContext::new(actor, now_ns(), self.chain.lock().tip())
    }

    fn seal(
        &self,
        context: HookContext,
        delta: &QuadDelta,
        committed: bool,
        error: Option<SanitizedError>,
        hook_results: Vec<HookResult>,
        started: Instant,
    ) -> EngineResult<Receipt> {
        let mut builder = ReceiptBuilder::new(ReceiptKind::Mutation, context.tx_id, &context.actor)
            .timestamp_ns(context.timestamp_ns)
            .prev_hash(&context.prev_tip_hash)
            .logic_hash(self.registry.read().logic_hash())
            .committed(committed)
            .duration_ns(started.elapsed().as_nanos() as u64)
            .additions(delta.additions().to_vec())
            .removals(delta.removals().to_vec())
            .hook_results(hook_results);
        if let Some(error) = error {
            builder = builder.error(error);
        }
        let receipt = builder.build();
        self.chain.lock().append(receipt.clone())?;
        Ok(receipt)
    }

    fn seal_tick(
        &self,
        context: HookContext,
        delta: QuadDelta,
        error: Option<SanitizedError>,
        hook_results: Vec<HookResult>,
        result: TickResult,
        started: Instant,
    ) -> EngineResult<Receipt> {
        let mut builder = ReceiptBuilder::new(ReceiptKind::Tick, context.tx_id, &context.actor)
            .timestamp_ns(context.timestamp_ns)
            .prev_hash(&context.prev_tip_hash)
            .logic_hash(self.registry.read().logic_hash())
            .committed(true)
            .duration_ns(started.elapsed().as_nanos() as u64)
            .additions(delta.additions().to_vec())
            .hook_results(hook_results)
            .tick(
                result.tick_number,
                result.triples_before,
                result.triples_after,
                result.delta,
            );
        if let Some(error) = error {
            builder = builder.error(error);
        }
        let receipt = builder.build();
        self.chain.lock().append(receipt.clone())?;
        Ok(receipt)
    }
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
