// Typed condition evaluation over a read-only store view, with
// content-addressed result caching and fail-closed error policy

use crate::cache::{CacheStats, ConditionCache};
use crate::shacl::{validate_shapes, ValidationReport};
use crate::view::StoreView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Comparison operator for count/value conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn compare(self, left: f64, right: f64) -> bool {
        match self {
            CmpOp::Eq => left == right,
            CmpOp::Lt => left < right,
            CmpOp::Gt => left > right,
            CmpOp::Le => left <= right,
            CmpOp::Ge => left >= right,
        }
    }
}

/// Aggregate function for window conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

/// Boolean combinator for composite conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolOp {
    And,
    Or,
    Not,
}

/// Metric a delta condition compares against its baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaMetric {
    TripleCount,
}

/// A typed condition. The canonical textual form (sorted-key JSON) is
/// the identity used for cache addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Ask {
        query: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    Select {
        query: String,
        op: CmpOp,
        rows: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    Shacl {
        shapes: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    Delta {
        metric: DeltaMetric,
        op: CmpOp,
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    Threshold {
        query: String,
        op: CmpOp,
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    Window {
        aggregate: Aggregate,
        over: String,
        op: CmpOp,
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    Composite {
        op: BoolOp,
        children: Vec<Condition>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl Condition {
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            Condition::Ask { timeout_ms, .. }
            | Condition::Select { timeout_ms, .. }
            | Condition::Shacl { timeout_ms, .. }
            | Condition::Delta { timeout_ms, .. }
            | Condition::Threshold { timeout_ms, .. }
            | Condition::Window { timeout_ms, .. }
            | Condition::Composite { timeout_ms, .. } => *timeout_ms,
        }
    }

    /// Canonical textual form: JSON with lexicographically sorted keys
    pub fn canonical_text(&self) -> String {
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    /// Content-addressed cache key over the canonical form
    pub fn cache_key(&self) -> String {
        atman_store::canon::blake3_hex(self.canonical_text().as_bytes())
    }

    /// Delta conditions depend on hook-held baselines, not on store
    /// state alone, so their results never enter the cache
    pub fn cacheable(&self) -> bool {
        match self {
            Condition::Delta { .. } => false,
            Condition::Composite { children, .. } => children.iter().all(Condition::cacheable),
            _ => true,
        }
    }
}

/// Payload attached to a condition result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionPayload {
    Count { count: u64 },
    Value { value: f64 },
    Report { report: ValidationReport },
    ChildrenEvaluated { children: u64 },
    Timeout,
}

/// Outcome of evaluating one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ConditionPayload>,
    pub duration_ns: u64,
    pub cache_hit: bool,
}

/// Condition evaluator with a store-version-keyed result cache
pub struct ConditionEvaluator {
    cache: parking_lot::Mutex<ConditionCache>,
}

impl ConditionEvaluator {
    pub fn new(cache_capacity: usize, cache_ttl: Duration) -> Self {
        Self {
            cache: parking_lot::Mutex::new(ConditionCache::new(cache_capacity, cache_ttl)),
        }
    }

    /// Evaluate a condition against the view at a given store version
    pub fn evaluate(
        &self,
        condition: &Condition,
        view: &StoreView,
        store_version: u64,
    ) -> ConditionResult {
        self.evaluate_with_baseline(condition, view, store_version, None)
    }

    /// Evaluate with a baseline for delta conditions (typically the
    /// triple count a hook recorded at its previous observation)
    pub fn evaluate_with_baseline(
        &self,
        condition: &Condition,
        view: &StoreView,
        store_version: u64,
        baseline: Option<f64>,
    ) -> ConditionResult {
        let started = Instant::now();
        let key = condition.cache_key();
        let cacheable = condition.cacheable();

        if cacheable {
            if let Some((matched, payload)) = self.cache.lock().get(&key, store_version) {
                return ConditionResult {
                    matched,
                    payload,
                    duration_ns: started.elapsed().as_nanos() as u64,
                    cache_hit: true,
                };
            }
        }

        let (matched, payload, errored) = eval_with_budget(condition, view, baseline);
        if cacheable && !errored {
            self.cache
                .lock()
                .put(key, store_version, matched, payload.clone());
        }

        ConditionResult {
            matched,
            payload,
            duration_ns: started.elapsed().as_nanos() as u64,
            cache_hit: false,
        }
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}

/// Evaluate under the condition's wall budget. Exceeding it yields
/// `matched = false` with a timeout payload; evaluation errors fail
/// closed. The third field flags error/timeout so failed evaluations
/// stay out of the cache.
fn eval_with_budget(
    condition: &Condition,
    view: &StoreView,
    baseline: Option<f64>,
) -> (bool, Option<ConditionPayload>, bool) {
    let Some(budget_ms) = condition.timeout_ms() else {
        return eval_logged(condition, view, baseline);
    };

    let (tx, rx) = mpsc::channel();
    let condition = condition.clone();
    let view = view.clone();
    let spawn = std::thread::Builder::new()
        .name("condition-eval".to_string())
        .spawn(move || {
            let _ = tx.send(eval_logged(&condition, &view, baseline));
        });
    if spawn.is_err() {
        return (false, None, true);
    }
    match rx.recv_timeout(Duration::from_millis(budget_ms)) {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(budget_ms, "condition evaluation timed out");
            (false, Some(ConditionPayload::Timeout), true)
        }
    }
}

fn eval_logged(
    condition: &Condition,
    view: &StoreView,
    baseline: Option<f64>,
) -> (bool, Option<ConditionPayload>, bool) {
    match eval_inner(condition, view, baseline) {
        Ok((matched, payload)) => (matched, payload, false),
        Err(e) => {
            tracing::warn!(error = %e, "condition evaluation failed closed");
            (false, None, true)
        }
    }
}

fn eval_inner(
    condition: &Condition,
    view: &StoreView,
    baseline: Option<f64>,
) -> crate::error::HooksResult<(bool, Option<ConditionPayload>)> {
    match condition {
        Condition::Ask { query, .. } => {
            let matched = view.ask(query)?;
            Ok((matched, None))
        }
        Condition::Select {
            query, op, rows, ..
        } => {
            let count = view.select(query)?.len() as u64;
            Ok((
                op.compare(count as f64, *rows as f64),
                Some(ConditionPayload::Count { count }),
            ))
        }
        Condition::Shacl { shapes, .. } => {
            let report = validate_shapes(view, shapes)?;
            let matched = report.conforms;
            Ok((matched, Some(ConditionPayload::Report { report })))
        }
        Condition::Delta {
            metric, op, value, ..
        } => {
            let current = match metric {
                DeltaMetric::TripleCount => view.triple_count()? as f64,
            };
            let change = current - baseline.unwrap_or(0.0);
            Ok((
                op.compare(change, *value),
                Some(ConditionPayload::Value { value: change }),
            ))
        }
        Condition::Threshold {
            query, op, value, ..
        } => {
            let rows = view.select(query)?;
            let first = rows
                .first()
                .and_then(|row| row.values().next())
                .and_then(|cell| parse_numeric(cell));
            match first {
                Some(observed) => Ok((
                    op.compare(observed, *value),
                    Some(ConditionPayload::Value { value: observed }),
                )),
                None => Ok((false, None)),
            }
        }
        Condition::Window {
            aggregate,
            over,
            op,
            value,
            ..
        } => {
            let query = format!("SELECT ?v WHERE {{ ?s <{over}> ?v }}");
            let rows = view.select(&query)?;
            let aggregated = aggregate_rows(*aggregate, &rows);
            match aggregated {
                Some(observed) => Ok((
                    op.compare(observed, *value),
                    Some(ConditionPayload::Value { value: observed }),
                )),
                None => Ok((false, None)),
            }
        }
        Condition::Composite { op, children, .. } => {
            eval_composite(*op, children, view, baseline)
        }
    }
}

/// Short-circuit evaluation left to right; the number of children
/// actually evaluated is observable in the payload
fn eval_composite(
    op: BoolOp,
    children: &[Condition],
    view: &StoreView,
    baseline: Option<f64>,
) -> crate::error::HooksResult<(bool, Option<ConditionPayload>)> {
    let mut evaluated = 0u64;
    let matched = match op {
        BoolOp::And => {
            let mut all = true;
            for child in children {
                evaluated += 1;
                let (m, _, _) = eval_with_budget(child, view, baseline);
                if !m {
                    all = false;
                    break;
                }
            }
            all && !children.is_empty()
        }
        BoolOp::Or => {
            let mut any = false;
            for child in children {
                evaluated += 1;
                let (m, _, _) = eval_with_budget(child, view, baseline);
                if m {
                    any = true;
                    break;
                }
            }
            any
        }
        BoolOp::Not => {
            if children.len() != 1 {
                return Err(crate::error::HookError::InvalidDefinition(format!(
                    "NOT composite requires exactly one child, got {}",
                    children.len()
                )));
            }
            evaluated = 1;
            let (m, _, _) = eval_with_budget(&children[0], view, baseline);
            !m
        }
    };
    Ok((
        matched,
        Some(ConditionPayload::ChildrenEvaluated {
            children: evaluated,
        }),
    ))
}

fn aggregate_rows(aggregate: Aggregate, rows: &[BTreeMap<String, String>]) -> Option<f64> {
    if aggregate == Aggregate::Count {
        return Some(rows.len() as f64);
    }
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.values().next())
        .filter_map(|cell| parse_numeric(cell))
        .collect();
    if values.is_empty() {
        return None;
    }
    match aggregate {
        Aggregate::Sum => Some(values.iter().sum()),
        Aggregate::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
        Aggregate::Min => values.iter().copied().reduce(f64::min),
        Aggregate::Max => values.iter().copied().reduce(f64::max),
        Aggregate::Count => unreachable!(),
    }
}

/// Numeric coercion of a term in its N-Triples rendering: the quoted
/// lexical form is parsed as a decimal, the datatype suffix ignored
/// per XSD numeric promotion
fn parse_numeric(term: &str) -> Option<f64> {
    let trimmed = term.trim();
    let lexical = if let Some(rest) = trimmed.strip_prefix('"') {
        rest.split('"').next()?
    } else {
        trimmed
    };
    lexical.parse::<f64>().ok()
}
