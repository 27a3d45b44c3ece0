// src/model/action.rs

use crate::model::artifact::Artifact;
use crate::model::key::{ActionKey, NodeKey};

/// Extra rewinding behaviour an action may carry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RewindCapability {
    #[default]
    Plain,
    /// The action depends on graph nodes that do not appear among its
    /// inputs; those nodes must be restarted together with the action.
    GraphAware { rewind_deps: Vec<NodeKey> },
}

/// A unit of work that produces derived artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub key: ActionKey,
    pub mnemonic: String,
    pub inputs: Vec<Artifact>,
    pub outputs: Vec<Artifact>,
    /// Whether the action may pass through an unpredictable subset of its
    /// inputs (e.g. a middleman or a symlink tree). Restarting such an action
    /// alone does not regenerate a lost input.
    pub propagates_inputs: bool,
    pub capability: RewindCapability,
}

impl Action {
    pub fn new(key: ActionKey, mnemonic: impl Into<String>) -> Self {
        Self {
            key,
            mnemonic: mnemonic.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            propagates_inputs: false,
            capability: RewindCapability::Plain,
        }
    }

    pub fn may_insensitively_propagate_inputs(&self) -> bool {
        self.propagates_inputs
    }

    /// Graph nodes to restart alongside this action, if it is graph-aware.
    pub fn graph_dependencies_for_rewinding(&self) -> Option<&[NodeKey]> {
        match &self.capability {
            RewindCapability::Plain => None,
            RewindCapability::GraphAware { rewind_deps } => Some(rewind_deps),
        }
    }

    pub fn node_key(&self) -> NodeKey {
        NodeKey::Action(self.key.clone())
    }

    pub fn derived_inputs(&self) -> impl Iterator<Item = &Artifact> {
        self.inputs.iter().filter(|a| !a.is_source())
    }
}
