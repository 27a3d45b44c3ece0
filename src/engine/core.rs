// src/engine/core.rs

//! Synchronous core of a build session's rewind handling.
//!
//! `RewindCore` turns a lost-input failure into an applied rewind: it
//! computes the plan, restarts the planned nodes in the graph and evicts the
//! restarted actions from the action state cache. It holds no channels and
//! no Tokio types, so it can be driven directly from tests or from blocking
//! worker threads.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::errors::{ActionExecutionError, ExecutionFailureKind, Result};
use crate::graph::{GraphAccessor, InMemoryGraph, Interrupt};
use crate::model::ActionKey;
use crate::rewind::{ActionRewindStrategy, BugReporter, LostInputHistory};

use super::cache::ActionStateCache;
use super::{ActionFailure, RewindOutcome, SessionOptions};

#[derive(Debug)]
pub struct RewindCore {
    strategy: ActionRewindStrategy,
    graph: Arc<InMemoryGraph>,
    cache: Arc<ActionStateCache>,
    interrupt: Interrupt,
    attempts: DashMap<ActionKey, u32>,
    options: SessionOptions,
}

impl RewindCore {
    pub fn new(
        graph: Arc<InMemoryGraph>,
        cache: Arc<ActionStateCache>,
        reporter: Arc<dyn BugReporter>,
        options: SessionOptions,
    ) -> Self {
        let strategy = ActionRewindStrategy::new(Arc::new(LostInputHistory::new()), reporter);
        Self {
            strategy,
            graph,
            cache,
            interrupt: Interrupt::new(),
            attempts: DashMap::new(),
            options,
        }
    }

    pub fn graph(&self) -> &Arc<InMemoryGraph> {
        &self.graph
    }

    pub fn cache(&self) -> &Arc<ActionStateCache> {
        &self.cache
    }

    pub fn strategy(&self) -> &ActionRewindStrategy {
        &self.strategy
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Rewinds of `action` handled so far in this build.
    pub fn attempts(&self, action: &ActionKey) -> u32 {
        self.attempts.get(action).map(|a| *a).unwrap_or(0)
    }

    /// Start a fresh build: forget lost inputs and rewind attempts from the
    /// previous one and clear any cancellation.
    ///
    /// Must not run while a rewind is being computed.
    pub fn begin_build(&self) {
        info!("starting new build; resetting rewind history");
        self.strategy.reset_history();
        self.attempts.clear();
        self.interrupt.clear();
    }

    /// Abort in-flight and future rewind computations of this build.
    pub fn cancel(&self) {
        warn!("build cancelled; interrupting rewinds");
        self.interrupt.cancel();
    }

    /// Handle one lost-input failure end to end.
    pub fn handle_lost_inputs(&self, failure: &ActionFailure) -> Result<RewindOutcome> {
        self.interrupt.check()?;

        let failed_action = self.graph.lookup_action(&failure.action)?;
        let attempt = self.next_attempt(&failure.action);
        if attempt > self.options.max_rewinds_per_action {
            warn!(
                action = %failure.action,
                attempt,
                max = self.options.max_rewinds_per_action,
                "rewind limit exceeded; failing action"
            );
            return Err(ActionExecutionError {
                action: failure.action.clone(),
                mnemonic: failed_action.mnemonic.clone(),
                kind: ExecutionFailureKind::RewindLimitExceeded,
                cause: failure.failure.clone(),
                catastrophe: false,
            }
            .into());
        }

        let direct_deps = self.graph.direct_deps(&failure.action)?;
        let plan = self.strategy.compute_rewind_plan(
            &*self.graph,
            &failed_action,
            &failure.action,
            &direct_deps,
            &failure.failure,
            self.graph.runfiles_owners(),
            &self.interrupt,
        )?;

        let newly_invalidated = self.graph.restart(plan.nodes_to_restart());

        let mut evicted = 0;
        if self.cache.evict(&failure.action) {
            evicted += 1;
        }
        for key in plan.additional_action_keys() {
            if self.cache.evict(key) {
                evicted += 1;
            }
        }

        info!(
            action = %failure.action,
            attempt,
            newly_invalidated,
            evicted,
            "rewound lost inputs; action will be retried"
        );

        Ok(RewindOutcome {
            plan,
            newly_invalidated,
            evicted,
            attempt,
        })
    }

    fn next_attempt(&self, action: &ActionKey) -> u32 {
        let mut entry = self.attempts.entry(action.clone()).or_insert(0);
        *entry += 1;
        *entry
    }
}
