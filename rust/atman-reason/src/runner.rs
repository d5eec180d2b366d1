// Convergence runner: repeat ticks until fixed point or budget

use crate::compile::CompiledRule;
use crate::error::{ReasonError, ReasonResult};
use crate::tick::{tick, TickResult};
use atman_store::GraphStore;

/// The outcome of a convergence run. `converged == false` means the
/// tick budget ran out before reaching a fixed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub ticks: Vec<TickResult>,
    pub converged: bool,
}

impl Run {
    /// Total triples added across the run
    pub fn total_delta(&self) -> u64 {
        self.ticks.iter().map(|t| t.delta).sum()
    }
}

/// Drive an arbitrary tick step to quiescence. The step receives the
/// 1-based tick number; the loop stops at the first zero delta or when
/// `max_ticks` is exhausted. With `strict`, any tick reporting failed
/// rules aborts the run.
pub fn run<F>(max_ticks: u64, strict: bool, mut step: F) -> ReasonResult<Run>
where
    F: FnMut(u64) -> ReasonResult<TickResult>,
{
    let mut ticks = Vec::new();
    for number in 1..=max_ticks {
        let result = step(number)?;
        let failed = result.rules_failed;
        let delta = result.delta;
        ticks.push(result);
        if strict && failed > 0 {
            return Err(ReasonError::StrictTick {
                tick: number,
                failed,
            });
        }
        if delta == 0 {
            return Ok(Run {
                ticks,
                converged: true,
            });
        }
    }
    tracing::warn!(max_ticks, "tick budget exhausted before fixed point");
    Ok(Run {
        ticks,
        converged: false,
    })
}

/// Repeat `tick` over the store until fixed point or budget exhaustion
pub fn run_to_completion(
    store: &GraphStore,
    rules: &[CompiledRule],
    max_ticks: u64,
    strict: bool,
) -> ReasonResult<Run> {
    run(max_ticks, strict, |number| {
        tick(store, rules, number).map(|output| output.result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_rules;

    const CHAIN: &str = concat!(
        "@prefix : <http://example.org/wf#> .\n",
        "{ ?t :status \"pending\" } => { ?t :status \"active\" } .\n",
        "{ ?t :status \"active\" } => { ?t :status \"completed\" } .\n",
    );

    fn store_with(topology: &str) -> GraphStore {
        let store = GraphStore::new().unwrap();
        store.load_turtle(topology).unwrap();
        store
    }

    #[test]
    fn test_converges_on_empty_input() {
        let store = GraphStore::new().unwrap();
        let run = run_to_completion(&store, &[], 10, false).unwrap();
        assert!(run.converged);
        assert_eq!(run.ticks.len(), 1);
        assert_eq!(run.ticks[0].delta, 0);
    }

    #[test]
    fn test_runs_to_fixed_point() {
        let rules = compile_rules(CHAIN).unwrap().rules;
        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n",
        );
        let run = run_to_completion(&store, &rules, 10, false).unwrap();
        assert!(run.converged);
        // pending -> active on tick 1, active -> completed on tick 2,
        // quiescent on tick 3
        assert_eq!(run.ticks.len(), 3);
        assert_eq!(run.total_delta(), 2);
        assert_eq!(run.ticks.last().unwrap().delta, 0);
        assert_eq!(store.triple_count().unwrap(), 3);
    }

    #[test]
    fn test_budget_exhaustion_reports_not_converged() {
        let rules = compile_rules(CHAIN).unwrap().rules;
        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n",
        );
        let run = run_to_completion(&store, &rules, 1, false).unwrap();
        assert!(!run.converged);
        assert_eq!(run.ticks.len(), 1);
    }

    #[test]
    fn test_two_runs_produce_identical_delta_sequences() {
        let rules = compile_rules(CHAIN).unwrap().rules;
        let deltas = || {
            let store = store_with(
                "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n:B :status \"pending\" .\n",
            );
            let run = run_to_completion(&store, &rules, 10, false).unwrap();
            (
                run.ticks.iter().map(|t| t.delta).collect::<Vec<_>>(),
                store.dump_turtle().unwrap(),
            )
        };
        let (d1, final1) = deltas();
        let (d2, final2) = deltas();
        assert_eq!(d1, d2);
        assert_eq!(final1, final2);
    }

    #[test]
    fn test_strict_mode_surfaces_rule_failures() {
        let mut rules = compile_rules(CHAIN).unwrap().rules;
        rules.push(CompiledRule {
            id: "rule-bad".to_string(),
            source_span: (0, 0),
            sparql: "CONSTRUCT { broken".to_string(),
            prefixes: Default::default(),
            variables: Default::default(),
        });
        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n",
        );

        let lenient = run_to_completion(&store, &rules, 10, false).unwrap();
        assert!(lenient.converged);
        assert!(lenient.ticks.iter().all(|t| t.rules_failed == 1));

        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n",
        );
        let strict = run_to_completion(&store, &rules, 10, true);
        assert!(matches!(
            strict,
            Err(ReasonError::StrictTick { tick: 1, failed: 1 })
        ));
    }
}
