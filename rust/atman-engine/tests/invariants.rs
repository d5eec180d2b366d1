// Invariant suite: properties that must hold for every run

use atman_engine::{
    Engine, Hook, HookContext, HookMode, HookOutcome, Node, Object, QuadDelta, StoreView, Triple,
    GENESIS_HASH,
};
use proptest::prelude::*;
use std::sync::Arc;

fn triple(local: &str, value: &str) -> Triple {
    Triple::new(
        Node::iri(format!("http://example.org/inv#{local}")),
        "urn:wf:status",
        Object::literal(value),
    )
}

fn noop_hook(id: &str, mode: HookMode, priority: u8) -> Hook {
    Hook::new(
        id,
        mode,
        Arc::new(|_: &StoreView, _: &QuadDelta, _: &HookContext| Ok(HookOutcome::pass())),
    )
    .with_priority(priority)
}

// Committed receipts form an unbroken hash chain
#[test]
fn receipts_chain_from_genesis() {
    let engine = Engine::with_defaults().unwrap();
    for n in 0..5 {
        engine
            .apply(
                &QuadDelta::new(vec![triple(&format!("t{n}"), "pending")], Vec::new()).unwrap(),
                "tester",
            )
            .unwrap();
    }

    let receipts = engine.receipts().unwrap();
    assert_eq!(receipts[0].prev_hash, GENESIS_HASH);
    for window in receipts.windows(2) {
        assert_eq!(window[1].prev_hash, window[0].merkle_root);
    }
}

// Aborted transactions leave the triple count unchanged
#[test]
fn aborted_transactions_do_not_move_state() {
    let engine = Engine::with_defaults().unwrap();
    engine
        .apply(
            &QuadDelta::new(vec![triple("seed", "pending")], Vec::new()).unwrap(),
            "seed",
        )
        .unwrap();
    engine.register_hook(Hook::new(
        "always-veto",
        HookMode::Pre,
        Arc::new(|_: &StoreView, _: &QuadDelta, _: &HookContext| Ok(HookOutcome::fail())),
    ));

    let before = engine.triple_count().unwrap();
    for n in 0..3 {
        let receipt = engine
            .apply(
                &QuadDelta::new(vec![triple(&format!("t{n}"), "x")], Vec::new()).unwrap(),
                "tester",
            )
            .unwrap();
        assert!(!receipt.committed);
    }
    assert_eq!(engine.triple_count().unwrap(), before);
}

// Ticks are monotonic
#[test]
fn ticks_never_shrink_the_store() {
    let engine = Engine::with_defaults().unwrap();
    engine
        .load_ontology(
            "{ ?t <urn:wf:status> \"pending\" } => { ?t <urn:wf:status> \"active\" } .\n",
        )
        .unwrap();
    engine
        .load_topology("<http://example.org/inv#a> <urn:wf:status> \"pending\" .")
        .unwrap();

    for _ in 0..4 {
        let result = engine.tick().unwrap();
        assert!(result.triples_after >= result.triples_before);
    }
}

// Register/unregister restores the logic hash
#[test]
fn logic_hash_round_trips_registration() {
    let engine = Engine::with_defaults().unwrap();
    engine.register_hook(noop_hook("stable", HookMode::Pre, 5));
    let before = engine.logic_hash();

    engine.register_hook(noop_hook("transient", HookMode::Post, 9));
    assert_ne!(engine.logic_hash(), before);
    engine.unregister_hook("transient");
    assert_eq!(engine.logic_hash(), before);
}

// run_to_completion is deterministic
#[test]
fn identical_inputs_produce_identical_runs() {
    let ontology = concat!(
        "{ ?t <urn:wf:status> \"pending\" } => { ?t <urn:wf:status> \"active\" } .\n",
        "{ ?t <urn:wf:status> \"active\" } => { ?t <urn:wf:status> \"completed\" } .\n",
    );
    let topology = concat!(
        "<http://example.org/inv#a> <urn:wf:status> \"pending\" .\n",
        "<http://example.org/inv#b> <urn:wf:status> \"pending\" .\n",
    );

    let run_once = || {
        let engine = Engine::with_defaults().unwrap();
        engine.load_ontology(ontology).unwrap();
        engine.load_topology(topology).unwrap();
        let run = engine.run_to_completion(None).unwrap();
        (
            run.ticks.iter().map(|t| t.delta).collect::<Vec<_>>(),
            engine.dump_store().unwrap(),
        )
    };

    let (deltas_a, final_a) = run_once();
    let (deltas_b, final_b) = run_once();
    assert_eq!(deltas_a, deltas_b);
    assert_eq!(final_a, final_b);
}

// Applying a delta and then its inverse restores the
// triple count
#[test]
fn inverse_delta_round_trip() {
    let engine = Engine::with_defaults().unwrap();
    engine
        .apply(
            &QuadDelta::new(vec![triple("base", "pending")], Vec::new()).unwrap(),
            "seed",
        )
        .unwrap();
    let before = engine.triple_count().unwrap();

    let delta = QuadDelta::new(
        vec![triple("x", "active"), triple("y", "active")],
        Vec::new(),
    )
    .unwrap();
    assert!(engine.apply(&delta, "tester").unwrap().committed);
    assert!(engine.apply(&delta.inverse(), "tester").unwrap().committed);
    assert_eq!(engine.triple_count().unwrap(), before);
}

// Logic hash is order-independent (property over
// arbitrary registration orders)
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn logic_hash_ignores_registration_order(seed in 0usize..24) {
        let ids = ["alpha", "bravo", "charlie", "delta"];
        let mut order: Vec<usize> = (0..4).collect();
        // A deterministic permutation derived from the seed
        for i in (1..4).rev() {
            order.swap(i, seed % (i + 1));
        }

        let reference = Engine::with_defaults().unwrap();
        for (n, id) in ids.iter().enumerate() {
            reference.register_hook(noop_hook(id, HookMode::Pre, n as u8));
        }

        let permuted = Engine::with_defaults().unwrap();
        for &i in &order {
            permuted.register_hook(noop_hook(ids[i], HookMode::Pre, i as u8));
        }

        prop_assert_eq!(reference.logic_hash(), permuted.logic_hash());
    }
}

// Canonical receipt serialization is byte-stable
#[test]
fn receipt_serialization_round_trips() {
    let engine = Engine::with_defaults().unwrap();
    let receipt = engine
        .apply(
            &QuadDelta::new(vec![triple("t", "pending")], Vec::new()).unwrap(),
            "tester",
        )
        .unwrap();

    let first = receipt.canonical_json().unwrap();
    let reparsed = atman_engine::Receipt::from_canonical_json(first.as_bytes()).unwrap();
    assert_eq!(reparsed.canonical_json().unwrap(), first);
}

// The logic hash recorded in a receipt reflects the hook set active
// at that point in the chain
#[test]
fn receipts_record_the_active_logic_hash() {
    let engine = Engine::with_defaults().unwrap();
    let empty_hash = engine.logic_hash();

    let r1 = engine
        .apply(
            &QuadDelta::new(vec![triple("t1", "pending")], Vec::new()).unwrap(),
            "tester",
        )
        .unwrap();
    assert_eq!(r1.logic_hash, empty_hash);

    engine.register_hook(noop_hook("auditor", HookMode::Post, 1));
    let with_hook = engine.logic_hash();
    assert_ne!(with_hook, empty_hash);

    let r2 = engine
        .apply(
            &QuadDelta::new(vec![triple("t2", "pending")], Vec::new()).unwrap(),
            "tester",
        )
        .unwrap();
    assert_eq!(r2.logic_hash, with_hook);
}
