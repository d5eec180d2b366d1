// rust/atman-engine/examples/full_workflow.rs
// Complete engine workflow: ontology → topology → guard hook →
// mutation → fixed-point reasoning → chain verification

use atman_engine::{
    Engine, Hook, HookContext, HookMode, HookOutcome, Node, Object, QuadDelta, StoreView, Triple,
};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Atman Full Workflow ===\n");

    let engine = Engine::with_defaults()?;

    // Step 1: logic — N3 implications compiled to SPARQL CONSTRUCT
    println!("STEP 1: Load ontology");
    let rules = engine.load_ontology(concat!(
        "{ ?t <urn:wf:status> \"pending\" } => { ?t <urn:wf:status> \"active\" } .\n",
        "{ ?t <urn:wf:status> \"active\" } => { ?t <urn:wf:status> \"completed\" } .\n",
    ))?;
    println!("  {rules} rule(s) compiled\n");

    // Step 2: state — Turtle facts
    println!("STEP 2: Load topology");
    let facts = engine.load_topology(concat!(
        "<http://example.org/wf#ship-order> <urn:wf:status> \"pending\" .\n",
        "<http://example.org/wf#bill-customer> <urn:wf:status> \"pending\" .\n",
    ))?;
    println!("  {facts} fact(s) ingested\n");

    // Step 3: a PRE guard protecting system triples
    println!("STEP 3: Register guard hook");
    engine.register_hook(
        Hook::new(
            "protect-system",
            HookMode::Pre,
            Arc::new(|_: &StoreView, delta: &QuadDelta, _: &HookContext| {
                let touches_system = delta
                    .removals()
                    .iter()
                    .any(|t| matches!(&t.subject, Node::Iri(iri) if iri.starts_with("urn:system:")));
                Ok(if touches_system {
                    HookOutcome::fail()
                } else {
                    HookOutcome::pass()
                })
            }),
        )
        .with_priority(10),
    );
    println!("  logic hash: {}\n", engine.logic_hash());

    // Step 4: a guarded mutation
    println!("STEP 4: Apply a mutation");
    let delta = QuadDelta::new(
        vec![Triple::new(
            Node::iri("http://example.org/wf#audit-order"),
            "urn:wf:status",
            Object::literal("pending"),
        )],
        Vec::new(),
    )?;
    let receipt = engine.apply(&delta, "operator")?;
    println!(
        "  committed={} tx={} merkle_root={}...\n",
        receipt.committed,
        receipt.tx_id,
        &receipt.merkle_root[..16]
    );

    // Step 5: run the reasoner to quiescence
    println!("STEP 5: Run to completion");
    let run = engine.run_to_completion(None)?;
    println!(
        "  converged={} in {} tick(s), {} triple(s) deduced",
        run.converged,
        run.ticks.len(),
        run.total_delta()
    );
    for (task, status) in engine.inspect_state()? {
        println!("    {task} -> {status}");
    }
    println!();

    // Step 6: independent chain verification
    println!("STEP 6: Verify the lockchain");
    let violations = engine.verify_chain()?;
    println!(
        "  {} receipt(s), {} violation(s), tip {}...",
        engine.chain_len(),
        violations.len(),
        &engine.tip()[..16]
    );

    Ok(())
}
