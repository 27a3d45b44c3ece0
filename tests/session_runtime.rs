// tests/session_runtime.rs

mod common;
use crate::common::builders::{ActionConfigBuilder, GraphBuilder};
use crate::common::fixtures::{action_node, artifact_node, failure_for, key, simple_chain};
use crate::common::recording::RecordingBugReporter;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;

use rewind::engine::{
    ActionFailure, ActionState, ActionStateCache, RewindCore, Runtime, SessionEvent,
    SessionOptions, SessionReport, handle_concurrently,
};
use rewind::errors::{ExecutionFailureKind, RewindError};
use rewind::graph::{GraphAccessor, InMemoryGraph};

type TestResult = Result<(), Box<dyn Error>>;

/// `out/a.o` feeds two independent consumers.
fn shared_producer_graph() -> InMemoryGraph {
    simple_chain()
        .with_action(
            "//pkg:g#0",
            ActionConfigBuilder::new("Link")
                .input("out/a.o")
                .output("out/g")
                .build(),
        )
        .build_graph()
}

fn core_for(graph: InMemoryGraph, max_rewinds: u32) -> Arc<RewindCore> {
    let cache = Arc::new(ActionStateCache::new());
    for action in graph.actions() {
        cache.record(
            action.key.clone(),
            ActionState {
                output_digests: vec![],
            },
        );
    }
    Arc::new(RewindCore::new(
        Arc::new(graph),
        cache,
        Arc::new(RecordingBugReporter::new()),
        SessionOptions {
            max_rewinds_per_action: max_rewinds,
        },
    ))
}

fn lost_for(core: &RewindCore, action: &str, paths: &[&str]) -> ActionFailure {
    ActionFailure::new(key(action), failure_for(core.graph(), paths))
}

#[test]
fn applying_a_plan_restarts_nodes_and_evicts_actions() {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//pkg:f#0", &["out/a.o"]);

    let outcome = core.handle_lost_inputs(&failure).unwrap();

    assert_eq!(outcome.attempt, 1);
    assert_eq!(outcome.newly_invalidated, 3);
    assert_eq!(outcome.evicted, 2);

    let graph = core.graph();
    assert!(!graph.is_done(&action_node("//pkg:f#0")));
    assert!(!graph.is_done(&action_node("//pkg:p#0")));
    assert!(!graph.is_done(&artifact_node("out/a.o")));
    assert!(graph.is_done(&artifact_node("src/a.c")));

    assert!(!core.cache().contains(&key("//pkg:f#0")));
    assert!(!core.cache().contains(&key("//pkg:p#0")));
}

#[test]
fn rewind_limit_turns_into_execution_failure() {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 1);

    let first = lost_for(&core, "//pkg:f#0", &["out/a.o"]);
    core.handle_lost_inputs(&first).unwrap();

    // Re-evaluated outputs get fresh digests, so this is a new loss.
    core.graph().complete_all();
    let second = lost_for(&core, "//pkg:f#0", &["out/a.o"]);
    assert_ne!(first.failure.lost_inputs, second.failure.lost_inputs);

    let err = core.handle_lost_inputs(&second).unwrap_err();
    assert_eq!(
        err.execution_kind(),
        Some(ExecutionFailureKind::RewindLimitExceeded)
    );
    assert_eq!(core.attempts(&key("//pkg:f#0")), 2);
}

#[test]
fn new_build_resets_history_and_attempts() {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//pkg:f#0", &["out/a.o"]);

    core.handle_lost_inputs(&failure).unwrap();
    let err = core.handle_lost_inputs(&failure).unwrap_err();
    assert_eq!(err.execution_kind(), Some(ExecutionFailureKind::RepeatedLoss));

    core.begin_build();
    assert!(core.strategy().history().is_empty());
    assert_eq!(core.attempts(&key("//pkg:f#0")), 0);

    let outcome = core.handle_lost_inputs(&failure).unwrap();
    assert_eq!(outcome.attempt, 1);
}

#[test]
fn cancelled_build_interrupts_until_next_build() {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//pkg:f#0", &["out/a.o"]);

    core.cancel();
    let err = core.handle_lost_inputs(&failure).unwrap_err();
    assert!(matches!(err, RewindError::Interrupted));

    core.begin_build();
    assert!(core.handle_lost_inputs(&failure).is_ok());
}

#[test]
fn unknown_failed_action_is_reported() {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//nope:x#0", &["out/a.o"]);

    let err = core.handle_lost_inputs(&failure).unwrap_err();
    assert!(matches!(err, RewindError::ActionNotFound(_)));
}

#[tokio::test]
async fn concurrent_failures_sharing_a_producer() -> TestResult {
    init_tracing();
    let core = core_for(shared_producer_graph(), 10);
    let failures = vec![
        lost_for(&core, "//pkg:f#0", &["out/a.o"]),
        lost_for(&core, "//pkg:g#0", &["out/a.o"]),
    ];

    let results = with_timeout(handle_concurrently(Arc::clone(&core), failures)).await?;
    assert_eq!(results.len(), 2);

    let mut invalidated = 0;
    for result in results {
        let outcome = result?;
        assert_eq!(outcome.attempt, 1);
        invalidated += outcome.newly_invalidated;
    }
    // f, g, out/a.o and p, each invalidated by exactly one rewind.
    assert_eq!(invalidated, 4);
    assert!(!core.graph().is_done(&action_node("//pkg:p#0")));
    assert!(!core.cache().contains(&key("//pkg:p#0")));
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicate_failure_is_rejected_once() -> TestResult {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//pkg:f#0", &["out/a.o"]);

    let results = with_timeout(handle_concurrently(
        Arc::clone(&core),
        vec![failure.clone(), failure],
    ))
    .await?;

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let repeated = results
        .iter()
        .filter(|r| {
            r.as_ref().err().and_then(|e| e.execution_kind())
                == Some(ExecutionFailureKind::RepeatedLoss)
        })
        .count();
    assert_eq!((ok, repeated), (1, 1));
    Ok(())
}

#[tokio::test]
async fn runtime_reports_each_failure() -> TestResult {
    init_tracing();
    let core = core_for(shared_producer_graph(), 10);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);
    let (report_tx, mut report_rx) = mpsc::channel::<SessionReport>(16);
    let runtime = Runtime::new(Arc::clone(&core), event_rx, report_tx);
    let handle = tokio::spawn(runtime.run());

    event_tx.send(SessionEvent::BuildStarted).await?;
    event_tx
        .send(SessionEvent::LostInputs(lost_for(&core, "//pkg:f#0", &["out/a.o"])))
        .await?;
    event_tx
        .send(SessionEvent::LostInputs(lost_for(&core, "//pkg:g#0", &["out/a.o"])))
        .await?;
    event_tx.send(SessionEvent::ShutdownRequested).await?;

    with_timeout(handle).await??;

    let mut reported = Vec::new();
    while let Some(report) = report_rx.recv().await {
        assert!(report.result.is_ok(), "{:?}", report.result);
        reported.push(report.action);
    }
    reported.sort();
    assert_eq!(reported, vec![key("//pkg:f#0"), key("//pkg:g#0")]);
    Ok(())
}

#[tokio::test]
async fn runtime_cancel_then_new_build() -> TestResult {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//pkg:f#0", &["out/a.o"]);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);
    let (report_tx, mut report_rx) = mpsc::channel::<SessionReport>(16);
    let handle = tokio::spawn(Runtime::new(Arc::clone(&core), event_rx, report_tx).run());

    event_tx.send(SessionEvent::Cancelled).await?;
    event_tx
        .send(SessionEvent::LostInputs(failure.clone()))
        .await?;
    let cancelled = with_timeout(report_rx.recv()).await.expect("report");
    assert!(matches!(cancelled.result, Err(RewindError::Interrupted)));

    event_tx.send(SessionEvent::BuildStarted).await?;
    event_tx.send(SessionEvent::LostInputs(failure)).await?;
    let retried = with_timeout(report_rx.recv()).await.expect("report");
    assert!(retried.result.is_ok());

    drop(event_tx);
    with_timeout(handle).await??;
    Ok(())
}

#[test]
fn graph_builder_exposes_done_nodes() {
    let graph = GraphBuilder::new()
        .with_action(
            "//pkg:p#0",
            ActionConfigBuilder::new("Compile").output("out/a").build(),
        )
        .build_graph();
    assert!(graph.is_done(&artifact_node("out/a")));
    assert_eq!(graph.generation(&artifact_node("out/a")), 1);
}

#[tokio::test]
async fn runtime_handles_cancel_while_failure_in_flight() -> TestResult {
    init_tracing();
    let core = core_for(shared_producer_graph(), 10);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);
    let (report_tx, mut report_rx) = mpsc::channel::<SessionReport>(16);
    let handle = tokio::spawn(Runtime::new(Arc::clone(&core), event_rx, report_tx).run());

    event_tx
        .send(SessionEvent::LostInputs(lost_for(&core, "//pkg:f#0", &["out/a.o"])))
        .await?;
    event_tx.send(SessionEvent::Cancelled).await?;
    event_tx
        .send(SessionEvent::LostInputs(lost_for(&core, "//pkg:g#0", &["out/a.o"])))
        .await?;
    event_tx.send(SessionEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    let mut reports = Vec::new();
    while let Some(report) = report_rx.recv().await {
        reports.push(report);
    }
    assert_eq!(reports.len(), 2);
    let g = reports
        .iter()
        .find(|r| r.action == key("//pkg:g#0"))
        .expect("report for g");
    assert!(matches!(g.result, Err(RewindError::Interrupted)));
    Ok(())
}

#[tokio::test]
async fn rewind_once_reports_plan_and_shuts_down() -> TestResult {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//pkg:f#0", &["out/a.o"]);

    let report = with_timeout(rewind::rewind_once(
        Arc::clone(&core),
        failure,
        std::future::pending(),
    ))
    .await?;

    assert_eq!(report.action, key("//pkg:f#0"));
    let outcome = report.result?;
    let additional: Vec<_> = outcome.plan.additional_action_keys().cloned().collect();
    assert_eq!(additional, vec![key("//pkg:p#0")]);
    Ok(())
}

#[tokio::test]
async fn rewind_once_accepts_cancel_during_computation() -> TestResult {
    init_tracing();
    let core = core_for(simple_chain().build_graph(), 10);
    let failure = lost_for(&core, "//pkg:f#0", &["out/a.o"]);

    // Cancellation may land before or after the plan is computed; either
    // way the step reports and the runtime shuts down.
    let report = with_timeout(rewind::rewind_once(Arc::clone(&core), failure, async {})).await?;

    match report.result {
        Ok(_) | Err(RewindError::Interrupted) => {}
        Err(e) => panic!("unexpected failure: {e:?}"),
    }
    Ok(())
}
