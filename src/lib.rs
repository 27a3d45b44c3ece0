// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod model;
pub mod rewind;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{
    ActionFailure, ActionState, ActionStateCache, RewindCore, RewindOutcome, Runtime,
    SessionEvent, SessionOptions, SessionReport,
};
use crate::graph::{GraphAccessor, InMemoryGraph};
use crate::model::{ActionInput, ActionKey, NodeKey};
use crate::rewind::{LostInputsFailure, reporter_for};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - graph description loading
/// - the in-memory graph, fully evaluated
/// - a build session runtime
/// - Ctrl-C handling (interrupts the computation)
///
/// and prints the rewind plan for the requested lost inputs.
pub async fn run(args: CliArgs) -> Result<()> {
    let graph_path = PathBuf::from(&args.graph);
    let cfg = load_and_validate(&graph_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let action: ActionKey = args
        .action
        .as_deref()
        .ok_or_else(|| anyhow!("--action is required unless --dry-run is given"))?
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let graph = Arc::new(InMemoryGraph::from_config(&cfg));
    graph.complete_all();

    let cache = Arc::new(ActionStateCache::new());
    seed_cache(&graph, &cache);

    let failure = lost_inputs_failure(&graph, &action, &args.lost)?;

    let options = SessionOptions {
        max_rewinds_per_action: cfg.config.max_rewinds_per_action,
    };
    let core = Arc::new(RewindCore::new(
        graph,
        cache,
        reporter_for(cfg.config.bug_report),
        options,
    ));

    info!(action = %action, lost = args.lost.len(), "computing rewind plan");
    let cancel = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let report = rewind_once(core, ActionFailure::new(action, failure), cancel).await?;
    let outcome = report.result?;
    print_plan(&report.action, &outcome);
    Ok(())
}

/// Run one build session step for `failure` on a fresh [`Runtime`].
///
/// The runtime keeps reading events until the report arrives, so `cancel`
/// resolving (e.g. on Ctrl-C) interrupts the computation.
pub async fn rewind_once<C>(
    core: Arc<RewindCore>,
    failure: ActionFailure,
    cancel: C,
) -> Result<SessionReport>
where
    C: Future<Output = ()> + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);
    let (report_tx, mut report_rx) = mpsc::channel::<SessionReport>(16);
    let handle = tokio::spawn(Runtime::new(core, event_rx, report_tx).run());

    // `BuildStarted` clears the interrupt, so cancellation is only wired up
    // after it is queued.
    event_tx.send(SessionEvent::BuildStarted).await?;
    let canceller = {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            cancel.await;
            let _ = tx.send(SessionEvent::Cancelled).await;
        })
    };
    event_tx.send(SessionEvent::LostInputs(failure)).await?;

    let report = report_rx.recv().await;
    canceller.abort();
    event_tx.send(SessionEvent::ShutdownRequested).await?;
    handle.await??;

    report.ok_or_else(|| anyhow!("session finished without a rewind report"))
}

/// Pretend every action already executed once, so rewinds have state to evict.
fn seed_cache(graph: &InMemoryGraph, cache: &ActionStateCache) {
    for action in graph.actions() {
        let output_digests = action
            .outputs
            .iter()
            .filter_map(|o| graph.value_if_done(&o.node_key()).map(|v| v.digest))
            .collect();
        cache.record(action.key.clone(), ActionState { output_digests });
    }
    debug!(actions = cache.len(), "seeded action state cache");
}

/// Build the failure an executor would report for `lost` paths.
///
/// Artifacts take their digest from the graph's current value. Members of
/// trees and runfiles are not graph nodes; their digest is derived from the
/// path.
fn lost_inputs_failure(
    graph: &InMemoryGraph,
    action: &ActionKey,
    lost: &[String],
) -> Result<LostInputsFailure> {
    let mut failure = LostInputsFailure::new(format!("{action} could not read its inputs"));
    failure.input_owners = graph.tree_owners().clone();

    for path in lost {
        let node = NodeKey::artifact(path.as_str());
        let (input, digest) = if graph.contains(&node) {
            let artifact = graph.artifact(path)?.clone();
            let digest = graph
                .digest_of(path)
                .ok_or_else(|| anyhow!("artifact {path} has no value"))?;
            (ActionInput::Artifact(artifact), digest)
        } else {
            let digest = blake3::hash(path.as_bytes()).to_hex().to_string();
            (ActionInput::virtual_input(path.as_str()), digest)
        };
        failure = failure.with_lost(digest, input);
    }

    Ok(failure)
}

fn print_plan(action: &ActionKey, outcome: &RewindOutcome) {
    let restart = outcome.plan.nodes_to_restart();
    println!("rewind plan for {action} (attempt {})", outcome.attempt);
    println!("  nodes to restart ({}):", restart.len());
    for node in restart.nodes() {
        println!("    - {node}");
    }

    let additional = outcome.plan.additional_actions_to_restart();
    println!("  additional actions to restart ({}):", additional.len());
    for a in additional {
        println!("    - {} ({})", a.key, a.mnemonic);
    }
    println!("  newly invalidated: {}", outcome.newly_invalidated);
    println!("  evicted action states: {}", outcome.evicted);
}

/// Simple dry-run output: print actions, their inputs and outputs.
fn print_dry_run(cfg: &ConfigFile) {
    println!("rewind dry-run");
    println!("  config.bug_report = {:?}", cfg.config.bug_report);
    println!(
        "  config.max_rewinds_per_action = {}",
        cfg.config.max_rewinds_per_action
    );
    println!();

    println!("actions ({}):", cfg.action.len());
    for (key, action) in cfg.action.iter() {
        println!("  - {key} ({})", action.mnemonic);
        if !action.inputs.is_empty() {
            println!("      inputs: {:?}", action.inputs);
        }
        if !action.outputs.is_empty() {
            println!("      outputs: {:?}", action.outputs);
        }
        if action.propagates_inputs {
            println!("      propagates_inputs: true");
        }
        if !action.rewind_deps.is_empty() {
            println!("      rewind_deps: {:?}", action.rewind_deps);
        }
    }

    println!();
    println!("artifacts:");
    for path in cfg.artifact_paths() {
        let artifact = cfg.artifact_for(path);
        println!("  - {path} ({:?})", artifact.kind);
    }

    debug!("dry-run complete (no plan computed)");
}
