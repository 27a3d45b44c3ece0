// src/rewind/plan.rs

use std::collections::HashSet;
use std::sync::Arc;

use crate::graph::Restart;
use crate::model::{Action, ActionKey, NodeKey};

/// What the executor must do to regenerate a failed action's lost inputs.
///
/// - `nodes_to_restart`: the failed action's node plus every node between it
///   and the actions that recreate the lost inputs, inclusive.
/// - `additional_actions_to_restart`: actions, other than the failed one,
///   whose cached execution state must be evicted. Each has its node in
///   `nodes_to_restart`.
#[derive(Debug, Clone)]
pub struct RewindPlan {
    nodes_to_restart: Restart,
    additional_actions_to_restart: Vec<Arc<Action>>,
}

impl RewindPlan {
    pub fn nodes_to_restart(&self) -> &Restart {
        &self.nodes_to_restart
    }

    pub fn additional_actions_to_restart(&self) -> &[Arc<Action>] {
        &self.additional_actions_to_restart
    }

    pub fn additional_action_keys(&self) -> impl Iterator<Item = &ActionKey> {
        self.additional_actions_to_restart.iter().map(|a| &a.key)
    }
}

/// Accumulates nodes and actions while a plan is being computed.
///
/// The failed action's node is present from the start, so it is never
/// reported as an additional action.
#[derive(Debug)]
pub struct RewindPlanBuilder {
    failed_node: NodeKey,
    deps_to_restart: HashSet<NodeKey>,
    additional_actions: Vec<Arc<Action>>,
}

impl RewindPlanBuilder {
    pub fn new(failed_key: &ActionKey) -> Self {
        let failed_node = NodeKey::Action(failed_key.clone());
        let mut deps_to_restart = HashSet::new();
        deps_to_restart.insert(failed_node.clone());
        Self {
            failed_node,
            deps_to_restart,
            additional_actions: Vec::new(),
        }
    }

    /// Mark a node for restart. Returns `true` if it was not marked yet.
    pub fn restart_node(&mut self, node: NodeKey) -> bool {
        self.deps_to_restart.insert(node)
    }

    pub fn restart_nodes<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = NodeKey>,
    {
        self.deps_to_restart.extend(nodes);
    }

    /// Mark an action's node for restart and remember the action for
    /// eviction. Returns `true` if the action is new to the plan, in which
    /// case the caller should check it for propagation.
    pub fn note_action(&mut self, action: &Arc<Action>) -> bool {
        if !self.deps_to_restart.insert(action.node_key()) {
            return false;
        }
        self.additional_actions.push(Arc::clone(action));
        true
    }

    pub fn build(self) -> RewindPlan {
        RewindPlan {
            nodes_to_restart: Restart::self_and(self.failed_node, self.deps_to_restart),
            additional_actions_to_restart: self.additional_actions,
        }
    }
}
