// src/graph/mod.rs

//! Interface to the evaluation graph that rewinding consults and mutates.
//!
//! The graph engine itself is an external collaborator. This module defines
//! what rewinding needs from it ([`GraphAccessor`]), the restart directive it
//! hands back ([`Restart`]), and a cancellation flag ([`Interrupt`]).
//! [`memory`] holds an in-memory implementation used by the diagnostic CLI
//! and by tests.

pub mod memory;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{Result, RewindError};
use crate::model::{Action, ActionKey, Artifact, NodeKey};

pub use memory::InMemoryGraph;

/// Value of a node that has finished evaluating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeValue {
    pub digest: String,
}

/// The action execution nodes an artifact's value depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactDependencies {
    /// Produced directly by a single action.
    Nontemplate(ActionKey),
    /// A tree artifact produced by the actions an action template expanded to.
    TemplateExpansion(BTreeSet<ActionKey>),
}

impl ArtifactDependencies {
    pub fn is_template_action_for_tree_artifact(&self) -> bool {
        matches!(self, ArtifactDependencies::TemplateExpansion(_))
    }

    pub fn nontemplate_action_execution_key(&self) -> Option<&ActionKey> {
        match self {
            ArtifactDependencies::Nontemplate(key) => Some(key),
            ArtifactDependencies::TemplateExpansion(_) => None,
        }
    }

    pub fn expanded_action_execution_keys(&self) -> Option<&BTreeSet<ActionKey>> {
        match self {
            ArtifactDependencies::Nontemplate(_) => None,
            ArtifactDependencies::TemplateExpansion(keys) => Some(keys),
        }
    }

    /// Every action execution key, regardless of variant.
    pub fn action_execution_keys(&self) -> BTreeSet<ActionKey> {
        match self {
            ArtifactDependencies::Nontemplate(key) => BTreeSet::from([key.clone()]),
            ArtifactDependencies::TemplateExpansion(keys) => keys.clone(),
        }
    }
}

/// Read access to the evaluation graph.
///
/// Implementations may block while a queried node finishes evaluating; the
/// caller treats that as a suspension point. Any query may fail with
/// [`RewindError::Interrupted`] when the evaluation is being cancelled.
pub trait GraphAccessor: Send + Sync {
    fn is_done(&self, node: &NodeKey) -> bool;

    fn value_if_done(&self, node: &NodeKey) -> Option<NodeValue>;

    /// Action execution keys the artifact depends on, or `None` if some of
    /// them are not done yet.
    fn discover_dependencies(&self, artifact: &Artifact) -> Result<Option<ArtifactDependencies>>;

    fn lookup_action(&self, key: &ActionKey) -> Result<Arc<Action>>;
}

/// Directive telling the graph engine to restart the current node together
/// with a set of other nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restart {
    self_node: NodeKey,
    others: BTreeSet<NodeKey>,
}

impl Restart {
    pub fn self_and<I>(self_node: NodeKey, nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeKey>,
    {
        let mut others: BTreeSet<NodeKey> = nodes.into_iter().collect();
        others.remove(&self_node);
        Self { self_node, others }
    }

    pub fn self_node(&self) -> &NodeKey {
        &self.self_node
    }

    /// Nodes restarted in addition to the current one.
    pub fn others(&self) -> &BTreeSet<NodeKey> {
        &self.others
    }

    pub fn contains(&self, node: &NodeKey) -> bool {
        &self.self_node == node || self.others.contains(node)
    }

    /// All nodes, the current one first.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeKey> {
        std::iter::once(&self.self_node).chain(self.others.iter())
    }

    pub fn len(&self) -> usize {
        self.others.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Shared cancellation flag for an evaluation.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`RewindError::Interrupted`] once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RewindError::Interrupted)
        } else {
            Ok(())
        }
    }
}
