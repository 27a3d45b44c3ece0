#![allow(dead_code)]

//! Ready-made graphs and helpers for building lost-input failures.

use std::sync::Arc;

use rewind::errors::Result;
use rewind::graph::{GraphAccessor, InMemoryGraph, Interrupt};
use rewind::model::{ActionInput, ActionKey, NodeKey};
use rewind::rewind::{ActionRewindStrategy, BugReporter, LostInputHistory, LostInputsFailure, RewindPlan};

use crate::builders::{ActionConfigBuilder, GraphBuilder};

pub fn key(s: &str) -> ActionKey {
    s.parse().expect("valid action key")
}

pub fn artifact_node(path: &str) -> NodeKey {
    NodeKey::artifact(path)
}

pub fn action_node(s: &str) -> NodeKey {
    NodeKey::Action(key(s))
}

/// `src/a.c -> P -> out/a.o -> F -> out/f`. P does not propagate inputs.
pub fn simple_chain() -> GraphBuilder {
    GraphBuilder::new()
        .with_action(
            "//pkg:p#0",
            ActionConfigBuilder::new("Compile")
                .input("src/a.c")
                .output("out/a.o")
                .build(),
        )
        .with_action(
            "//pkg:f#0",
            ActionConfigBuilder::new("Link")
                .input("out/a.o")
                .output("out/f")
                .build(),
        )
}

/// `src/b.in -> R -> out/b -> Q -> out/t (tree: out/t/l) -> F -> out/f`.
/// Q propagates its inputs.
pub fn propagating_tree() -> GraphBuilder {
    GraphBuilder::new()
        .with_action(
            "//pkg:r#0",
            ActionConfigBuilder::new("Genrule")
                .input("src/b.in")
                .output("out/b")
                .build(),
        )
        .with_action(
            "//pkg:q#0",
            ActionConfigBuilder::new("SymlinkTree")
                .input("out/b")
                .output("out/t")
                .propagates_inputs()
                .build(),
        )
        .with_tree("out/t", &["out/t/l"])
        .with_action(
            "//pkg:f#0",
            ActionConfigBuilder::new("Link")
                .input("out/t")
                .output("out/f")
                .build(),
        )
}

/// The lost input and digest an executor would report for `path`.
///
/// Graph artifacts report their current value's digest; anything else is a
/// virtual input whose digest is derived from the path.
pub fn lost(graph: &InMemoryGraph, path: &str) -> (String, ActionInput) {
    let node = NodeKey::artifact(path);
    if graph.contains(&node) {
        let artifact = graph.artifact(path).expect("known artifact").clone();
        let digest = graph
            .value_if_done(&node)
            .map(|v| v.digest)
            .expect("artifact is done");
        (digest, ActionInput::Artifact(artifact))
    } else {
        let digest = blake3::hash(path.as_bytes()).to_hex().to_string();
        (digest, ActionInput::virtual_input(path))
    }
}

/// Failure losing every path in `paths`, with the graph's tree owners.
pub fn failure_for(graph: &InMemoryGraph, paths: &[&str]) -> LostInputsFailure {
    let mut failure = LostInputsFailure::new("lost inputs");
    failure.input_owners = graph.tree_owners().clone();
    for path in paths {
        let (digest, input) = lost(graph, path);
        failure = failure.with_lost(digest, input);
    }
    failure
}

pub fn strategy_with(reporter: Arc<dyn BugReporter>) -> ActionRewindStrategy {
    ActionRewindStrategy::new(Arc::new(LostInputHistory::new()), reporter)
}

/// Compute a plan for `failed` the way the executor does.
pub fn plan_for(
    strategy: &ActionRewindStrategy,
    graph: &InMemoryGraph,
    failed: &str,
    failure: &LostInputsFailure,
) -> Result<RewindPlan> {
    plan_with_interrupt(strategy, graph, failed, failure, &Interrupt::new())
}

pub fn plan_with_interrupt(
    strategy: &ActionRewindStrategy,
    graph: &InMemoryGraph,
    failed: &str,
    failure: &LostInputsFailure,
    interrupt: &Interrupt,
) -> Result<RewindPlan> {
    let failed_key = key(failed);
    let action = graph.lookup_action(&failed_key)?;
    let direct_deps = graph.direct_deps(&failed_key)?;
    strategy.compute_rewind_plan(
        graph,
        &action,
        &failed_key,
        &direct_deps,
        failure,
        graph.runfiles_owners(),
        interrupt,
    )
}
