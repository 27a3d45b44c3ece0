// src/rewind/strategy.rs

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{ActionExecutionError, ExecutionFailureKind, Result};
use crate::graph::{GraphAccessor, Interrupt};
use crate::model::{Action, ActionKey, NodeKey};
use crate::rewind::bug_report::BugReporter;
use crate::rewind::history::LostInputHistory;
use crate::rewind::lost_inputs::LostInputsFailure;
use crate::rewind::owners::{LostInputsByOwner, OwnerLookup, OwnershipResolver};
use crate::rewind::plan::{RewindPlan, RewindPlanBuilder};
use crate::rewind::walker::PropagationWalker;

/// Given an action that failed because inputs generated by other actions
/// were lost, finds the actions that generated them and the graph nodes
/// that must be restarted to recreate them.
#[derive(Debug, Clone)]
pub struct ActionRewindStrategy {
    history: Arc<LostInputHistory>,
    reporter: Arc<dyn BugReporter>,
}

impl ActionRewindStrategy {
    pub fn new(history: Arc<LostInputHistory>, reporter: Arc<dyn BugReporter>) -> Self {
        Self { history, reporter }
    }

    pub fn history(&self) -> &Arc<LostInputHistory> {
        &self.history
    }

    /// Clear the history of failed actions' lost inputs.
    ///
    /// Must only be called between builds, never while a rewind plan is
    /// being computed.
    pub fn reset_history(&self) {
        self.history.reset();
    }

    /// Compute the [`RewindPlan`] for `failed_action`.
    ///
    /// Every node between the failed action's node and the nodes of the
    /// actions that create the lost inputs, inclusive, is restarted, so that
    /// re-evaluating the failed action also re-evaluates those producers.
    ///
    /// Fails with an ordinary execution error if the action already lost one
    /// of these inputs during this build, or if a lost input is a source
    /// artifact. Fails with a defect if the failure is structurally
    /// impossible, and with `Interrupted` on cancellation.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_rewind_plan(
        &self,
        graph: &dyn GraphAccessor,
        failed_action: &Action,
        failed_key: &ActionKey,
        direct_deps: &HashSet<NodeKey>,
        failure: &LostInputsFailure,
        runfiles_owners: &dyn OwnerLookup,
        interrupt: &Interrupt,
    ) -> Result<RewindPlan> {
        self.history
            .check_not_repeated(failed_action, failed_key, failure, self.reporter.as_ref())?;

        let resolver = OwnershipResolver::new(&failure.input_owners, runfiles_owners, direct_deps);
        let lost_by_owner = resolver
            .resolve(failure.inputs(), failed_action)
            .inspect_err(|e| {
                if e.is_defect() {
                    self.reporter.report(&e.to_string());
                }
            })?;

        self.check_no_source_artifacts(&lost_by_owner, failed_action, failed_key, failure)?;

        let mut builder = RewindPlanBuilder::new(failed_key);
        {
            let mut walker = PropagationWalker::new(graph, interrupt, &mut builder);
            for artifact in lost_by_owner.keys() {
                walker.rewind_artifact(artifact)?;
            }
        }
        let plan = builder.build();

        info!(
            action = %failed_key,
            lost_inputs = failure.lost_inputs.len(),
            responsible_deps = lost_by_owner.len(),
            nodes_to_restart = plan.nodes_to_restart().len(),
            additional_actions = plan.additional_actions_to_restart().len(),
            "computed rewind plan"
        );

        Ok(plan)
    }

    /// Source artifacts can't be rewound. They should not be losable, but
    /// infrastructure failures can make them look lost, so the build fails
    /// instead of crashing.
    fn check_no_source_artifacts(
        &self,
        lost_by_owner: &LostInputsByOwner,
        failed_action: &Action,
        failed_key: &ActionKey,
        failure: &LostInputsFailure,
    ) -> Result<()> {
        let Some((artifact, inputs)) = lost_by_owner.iter().find(|(a, _)| a.is_source()) else {
            return Ok(());
        };

        let inputs: Vec<&str> = inputs.iter().map(|i| i.exec_path()).collect();
        info!(
            lost_artifact = %artifact,
            ?inputs,
            failed_action = %failed_key,
            "lost artifact unexpectedly source"
        );
        debug!(failure = %failure, "failing action instead of rewinding");

        Err(ActionExecutionError {
            action: failed_key.clone(),
            mnemonic: failed_action.mnemonic.clone(),
            kind: ExecutionFailureKind::SourceArtifactLost,
            cause: failure.clone(),
            catastrophe: false,
        }
        .into())
    }
}
