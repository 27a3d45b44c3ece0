// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info};

use crate::errors::{Error, Result};
use crate::model::ActionKey;

use super::core::RewindCore;
use super::{ActionFailure, RewindOutcome, SessionEvent};

/// Result of handling one lost-input failure, as reported by [`Runtime`].
#[derive(Debug)]
pub struct SessionReport {
    pub action: ActionKey,
    pub result: Result<RewindOutcome>,
}

/// Compute and apply rewind plans for several concurrently failing actions.
///
/// Each computation runs on a blocking worker thread because graph queries
/// may block. Results are returned in the order of `failures`.
pub async fn handle_concurrently(
    core: Arc<RewindCore>,
    failures: Vec<ActionFailure>,
) -> Result<Vec<Result<RewindOutcome>>> {
    let count = failures.len();
    let mut set = JoinSet::new();

    for (index, failure) in failures.into_iter().enumerate() {
        let core = Arc::clone(&core);
        set.spawn_blocking(move || (index, core.handle_lost_inputs(&failure)));
    }

    let mut results: Vec<Option<Result<RewindOutcome>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (index, result) = joined.map_err(Error::from)?;
        results[index] = Some(result);
    }

    Ok(results.into_iter().flatten().collect())
}

/// Drives a [`RewindCore`] in response to [`SessionEvent`]s.
///
/// Lost-input failures are handled concurrently on blocking worker threads;
/// each finished computation is sent back as a [`SessionReport`]. A new
/// build only starts once every in-flight computation has finished, so the
/// lost input history is never reset under a running rewind.
pub struct Runtime {
    core: Arc<RewindCore>,
    event_rx: mpsc::Receiver<SessionEvent>,
    report_tx: mpsc::Sender<SessionReport>,
    in_flight: JoinSet<SessionReport>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: Arc<RewindCore>,
        event_rx: mpsc::Receiver<SessionEvent>,
        report_tx: mpsc::Sender<SessionReport>,
    ) -> Self {
        Self {
            core,
            event_rx,
            report_tx,
            in_flight: JoinSet::new(),
        }
    }

    /// Main event loop.
    ///
    /// Runs until `ShutdownRequested` arrives or the event channel closes,
    /// then waits for in-flight computations and reports them.
    pub async fn run(mut self) -> Result<()> {
        info!("rewind session runtime started");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        info!("session event channel closed; exiting");
                        break;
                    };
                    debug!(?event, "session received event");
                    if !self.handle_event(event).await? {
                        info!("shutdown requested; stopping session runtime");
                        break;
                    }
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.forward(joined).await?;
                }
            }
        }

        self.drain().await?;
        info!("session runtime exiting");
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    async fn handle_event(&mut self, event: SessionEvent) -> Result<bool> {
        match event {
            SessionEvent::BuildStarted => {
                self.drain().await?;
                self.core.begin_build();
            }
            SessionEvent::LostInputs(failure) => {
                let core = Arc::clone(&self.core);
                self.in_flight.spawn_blocking(move || SessionReport {
                    action: failure.action.clone(),
                    result: core.handle_lost_inputs(&failure),
                });
            }
            SessionEvent::Cancelled => {
                self.core.cancel();
            }
            SessionEvent::ShutdownRequested => return Ok(false),
        }
        Ok(true)
    }

    async fn drain(&mut self) -> Result<()> {
        while let Some(joined) = self.in_flight.join_next().await {
            self.forward(joined).await?;
        }
        Ok(())
    }

    async fn forward(&mut self, joined: std::result::Result<SessionReport, JoinError>) -> Result<()> {
        let report = joined.map_err(Error::from)?;
        debug!(action = %report.action, ok = report.result.is_ok(), "rewind finished");
        self.report_tx.send(report).await.map_err(Error::from)?;
        Ok(())
    }
}
