// One fixed-point step: snapshot count, fire every rule, ingest the
// deductions, measure the delta. Additions only — a tick never removes.

use crate::compile::CompiledRule;
use crate::error::ReasonResult;
use atman_store::{GraphStore, Triple};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

/// Measurements from one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickResult {
    pub tick_number: u64,
    pub triples_before: u64,
    pub triples_after: u64,
    /// `triples_after - triples_before`, never negative
    pub delta: u64,
    /// Rules whose CONSTRUCT produced at least one triple
    pub rules_fired: u64,
    /// Rules skipped because their evaluation failed
    pub rules_failed: u64,
    pub duration_ns: u64,
}

/// A tick result together with the deduced triple set, for callers
/// that hash or audit the tick delta
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub result: TickResult,
    pub produced: BTreeSet<Triple>,
}

/// Run all rules once against the store, in source order. A failing
/// rule is logged, counted and skipped; the tick continues.
pub fn tick(store: &GraphStore, rules: &[CompiledRule], tick_number: u64) -> ReasonResult<TickOutput> {
    let started = Instant::now();
    let before = store.triple_count()? as u64;

    let mut produced: BTreeSet<Triple> = BTreeSet::new();
    let mut rules_fired = 0u64;
    let mut rules_failed = 0u64;

    for rule in rules {
        match store.construct(&rule.sparql) {
            Ok(deductions) => {
                if !deductions.is_empty() {
                    rules_fired += 1;
                }
                produced.extend(deductions);
            }
            Err(e) => {
                tracing::warn!(rule = %rule.id, error = %e, "rule evaluation failed, skipping");
                rules_failed += 1;
            }
        }
    }

    for triple in &produced {
        store.insert(triple)?;
    }

    let after = store.triple_count()? as u64;
    Ok(TickOutput {
        result: TickResult {
            tick_number,
            triples_before: before,
            triples_after: after,
            delta: after - before,
            rules_fired,
            rules_failed,
            duration_ns: started.elapsed().as_nanos() as u64,
        },
        produced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_rules;

    const ONTOLOGY: &str = concat!(
        "@prefix : <http://example.org/wf#> .\n",
        "{ ?t :status \"pending\" } => { ?t :status \"active\" } .\n",
    );

    fn store_with(topology: &str) -> GraphStore {
        let store = GraphStore::new().unwrap();
        store.load_turtle(topology).unwrap();
        store
    }

    #[test]
    fn test_empty_store_empty_rules() {
        let store = GraphStore::new().unwrap();
        let output = tick(&store, &[], 1).unwrap();
        assert_eq!(output.result.delta, 0);
        assert_eq!(output.result.triples_before, 0);
        assert_eq!(output.result.triples_after, 0);
        assert_eq!(output.result.rules_fired, 0);
        assert!(output.produced.is_empty());
    }

    #[test]
    fn test_tick_deduces_and_ingests() {
        let rules = compile_rules(ONTOLOGY).unwrap().rules;
        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n",
        );

        let output = tick(&store, &rules, 1).unwrap();
        assert_eq!(output.result.triples_before, 1);
        assert_eq!(output.result.triples_after, 2);
        assert_eq!(output.result.delta, 1);
        assert_eq!(output.result.rules_fired, 1);
        assert_eq!(output.result.rules_failed, 0);
        assert_eq!(output.produced.len(), 1);
    }

    #[test]
    fn test_tick_never_removes() {
        let rules = compile_rules(ONTOLOGY).unwrap().rules;
        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n:B :other \"x\" .\n",
        );
        let before = store.triple_count().unwrap();
        let output = tick(&store, &rules, 1).unwrap();
        assert!(output.result.triples_after as usize >= before);
        assert!(store
            .ask("ASK { ?s <http://example.org/wf#other> \"x\" }")
            .unwrap());
    }

    #[test]
    fn test_tick_at_fixed_point_is_zero_delta() {
        let rules = compile_rules(ONTOLOGY).unwrap().rules;
        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n",
        );
        tick(&store, &rules, 1).unwrap();
        let second = tick(&store, &rules, 2).unwrap();
        // The consequent is already entailed; rule still fires but the
        // store does not grow
        assert_eq!(second.result.delta, 0);
    }

    #[test]
    fn test_failing_rule_skipped_and_counted() {
        let mut rules = compile_rules(ONTOLOGY).unwrap().rules;
        rules.push(CompiledRule {
            id: "rule-bad".to_string(),
            source_span: (0, 0),
            sparql: "CONSTRUCT { ?x ?y } WHERE { broken".to_string(),
            prefixes: Default::default(),
            variables: Default::default(),
        });
        let store = store_with(
            "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n",
        );

        let output = tick(&store, &rules, 1).unwrap();
        assert_eq!(output.result.rules_failed, 1);
        assert_eq!(output.result.rules_fired, 1);
        assert_eq!(output.result.delta, 1);
    }

    #[test]
    fn test_tick_is_deterministic() {
        let rules = compile_rules(ONTOLOGY).unwrap().rules;
        let run = || {
            let store = store_with(
                "@prefix : <http://example.org/wf#> .\n:A :status \"pending\" .\n:B :status \"pending\" .\n",
            );
            let out = tick(&store, &rules, 1).unwrap();
            (out.result.delta, out.produced)
        };
        let (delta1, produced1) = run();
        let (delta2, produced2) = run();
        assert_eq!(delta1, delta2);
        assert_eq!(produced1, produced2);
    }
}
