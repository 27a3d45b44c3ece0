// src/rewind/walker.rs

//! Breadth-first expansion of the restart set through actions that may
//! insensitively propagate their inputs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::graph::{GraphAccessor, Interrupt};
use crate::model::{Action, ActionKey, Artifact};
use crate::rewind::plan::RewindPlanBuilder;

/// Actions that generate `artifact`, keyed by their execution key.
///
/// Returns `None` if some of the artifact's dependencies are not done.
pub fn actions_for_lost_artifact(
    graph: &dyn GraphAccessor,
    artifact: &Artifact,
    interrupt: &Interrupt,
) -> Result<Option<BTreeMap<ActionKey, Arc<Action>>>> {
    interrupt.check()?;

    let Some(deps) = graph.discover_dependencies(artifact)? else {
        return Ok(None);
    };

    let keys: Vec<&ActionKey> = if deps.is_template_action_for_tree_artifact() {
        deps.expanded_action_execution_keys()
            .into_iter()
            .flatten()
            .collect()
    } else {
        deps.nontemplate_action_execution_key().into_iter().collect()
    };

    let mut actions = BTreeMap::new();
    for key in keys {
        interrupt.check()?;
        let action = graph.lookup_action(key)?;
        actions.insert(key.clone(), action);
    }
    Ok(Some(actions))
}

pub struct PropagationWalker<'a> {
    graph: &'a dyn GraphAccessor,
    interrupt: &'a Interrupt,
    builder: &'a mut RewindPlanBuilder,
}

impl<'a> PropagationWalker<'a> {
    pub fn new(
        graph: &'a dyn GraphAccessor,
        interrupt: &'a Interrupt,
        builder: &'a mut RewindPlanBuilder,
    ) -> Self {
        Self {
            graph,
            interrupt,
            builder,
        }
    }

    /// Restart `artifact` and everything needed to regenerate it.
    pub fn rewind_artifact(&mut self, artifact: &Artifact) -> Result<()> {
        self.builder.restart_node(artifact.node_key());

        let Some(actions) = self.producers_of(artifact)? else {
            return Ok(());
        };
        let to_check = self.note_actions(actions);
        self.check_actions(to_check)
    }

    fn producers_of(
        &self,
        artifact: &Artifact,
    ) -> Result<Option<BTreeMap<ActionKey, Arc<Action>>>> {
        let actions = actions_for_lost_artifact(self.graph, artifact, self.interrupt)?;
        if actions.is_none() {
            // Another rewind must be in flight for the shared deps; no need
            // to restart them twice.
            debug!(
                artifact = %artifact,
                "some deps of artifact are not done; skipping expansion"
            );
        }
        Ok(actions)
    }

    fn note_actions(&mut self, actions: BTreeMap<ActionKey, Arc<Action>>) -> Vec<Arc<Action>> {
        actions
            .into_values()
            .filter(|action| self.builder.note_action(action))
            .collect()
    }

    fn check_actions(&mut self, actions: Vec<Arc<Action>>) -> Result<()> {
        let mut unchecked: VecDeque<Arc<Action>> = actions.into();

        while let Some(action) = unchecked.pop_front() {
            self.interrupt.check()?;

            if let Some(extra) = action.graph_dependencies_for_rewinding() {
                debug!(
                    action = %action.key,
                    extra = extra.len(),
                    "restarting graph dependencies of graph-aware action"
                );
                self.builder.restart_nodes(extra.iter().cloned());
            }

            if !action.may_insensitively_propagate_inputs() {
                continue;
            }

            // Restarting this action alone won't recreate the lost input; its
            // derived inputs and their generating actions must rerun too.
            // Marked inputs may lack noted producers (graph-aware extra deps),
            // so producers are always looked up.
            for input in action.derived_inputs() {
                self.builder.restart_node(input.node_key());

                let Some(producers) = self.producers_of(input)? else {
                    continue;
                };
                unchecked.extend(self.note_actions(producers));
            }
        }

        Ok(())
    }
}
