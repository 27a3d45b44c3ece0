// src/graph/memory.rs

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use blake3::Hasher;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::config::model::ConfigFile;
use crate::errors::{Result, RewindError};
use crate::graph::{ArtifactDependencies, GraphAccessor, NodeValue, Restart};
use crate::model::{Action, ActionKey, Artifact, ArtifactKind, NodeKey, RewindCapability};
use crate::rewind::OwnerMap;

/// In-memory evaluation graph built from a validated [`ConfigFile`].
///
/// Structure (actions, artifacts, ownership) is immutable. Evaluation state
/// is concurrent: any thread may query, restart or complete nodes. Every
/// node starts out not done.
#[derive(Debug)]
pub struct InMemoryGraph {
    actions: HashMap<ActionKey, Arc<Action>>,
    artifacts: HashMap<String, Artifact>,
    producers: HashMap<String, ArtifactDependencies>,
    tree_owners: OwnerMap,
    runfiles_owners: OwnerMap,
    extra_nodes: BTreeSet<NodeKey>,
    /// Values of nodes that are currently done.
    done: DashMap<NodeKey, NodeValue>,
    /// How many times each node has been evaluated.
    generations: DashMap<NodeKey, u64>,
}

impl InMemoryGraph {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut artifacts = HashMap::new();
        for path in cfg.artifact_paths() {
            artifacts.insert(path.to_string(), cfg.artifact_for(path));
        }

        let mut producers = HashMap::new();
        for path in artifacts.keys() {
            if let Some(key) = cfg.producer_of(path) {
                producers.insert(path.clone(), ArtifactDependencies::Nontemplate(key.clone()));
            } else if let Some(keys) = cfg.expansion_of(path) {
                producers.insert(
                    path.clone(),
                    ArtifactDependencies::TemplateExpansion(keys.clone()),
                );
            }
        }

        let mut tree_owners = OwnerMap::new();
        let mut runfiles_owners = OwnerMap::new();
        for (path, artifact_cfg) in cfg.artifact.iter() {
            let owner = cfg.artifact_for(path);
            let owners = match artifact_cfg.kind {
                ArtifactKind::Tree => &mut tree_owners,
                ArtifactKind::Runfiles => &mut runfiles_owners,
                ArtifactKind::Source | ArtifactKind::Derived => continue,
            };
            for member in artifact_cfg.members.iter() {
                owners.insert(member.clone(), owner.clone());
            }
        }

        let mut actions = HashMap::new();
        let mut extra_nodes = BTreeSet::new();
        for (key, action_cfg) in cfg.action.iter() {
            let rewind_deps: Vec<NodeKey> = action_cfg
                .rewind_dep_keys()
                .into_iter()
                .map(|dep| match dep {
                    NodeKey::Other(path) if artifacts.contains_key(&path) => {
                        NodeKey::Artifact(path)
                    }
                    other => other,
                })
                .collect();
            extra_nodes.extend(rewind_deps.iter().cloned());

            let capability = if rewind_deps.is_empty() {
                RewindCapability::Plain
            } else {
                RewindCapability::GraphAware { rewind_deps }
            };

            let action = Action {
                key: key.clone(),
                mnemonic: action_cfg.mnemonic.clone(),
                inputs: action_cfg.inputs.iter().map(|p| cfg.artifact_for(p)).collect(),
                outputs: action_cfg.outputs.iter().map(|p| cfg.artifact_for(p)).collect(),
                propagates_inputs: action_cfg.propagates_inputs,
                capability,
            };
            actions.insert(key.clone(), Arc::new(action));
        }

        Self {
            actions,
            artifacts,
            producers,
            tree_owners,
            runfiles_owners,
            extra_nodes,
            done: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    /// Every node of the graph.
    pub fn nodes(&self) -> Vec<NodeKey> {
        let mut nodes: Vec<NodeKey> = self
            .artifacts
            .keys()
            .map(|p| NodeKey::Artifact(p.clone()))
            .chain(self.actions.keys().map(|k| NodeKey::Action(k.clone())))
            .chain(self.extra_nodes.iter().cloned())
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    pub fn contains(&self, node: &NodeKey) -> bool {
        match node {
            NodeKey::Artifact(path) => self.artifacts.contains_key(path),
            NodeKey::Action(key) => self.actions.contains_key(key),
            NodeKey::Other(_) => self.extra_nodes.contains(node),
        }
    }

    pub fn actions(&self) -> impl Iterator<Item = &Arc<Action>> {
        self.actions.values()
    }

    pub fn action(&self, key: &ActionKey) -> Option<&Arc<Action>> {
        self.actions.get(key)
    }

    pub fn artifact(&self, exec_path: &str) -> Result<&Artifact> {
        self.artifacts
            .get(exec_path)
            .ok_or_else(|| RewindError::UnknownArtifact(exec_path.to_string()))
    }

    /// Members of tree artifacts and filesets, mapped to their owner.
    pub fn tree_owners(&self) -> &OwnerMap {
        &self.tree_owners
    }

    /// Members of runfiles collections, mapped to their owner.
    pub fn runfiles_owners(&self) -> &OwnerMap {
        &self.runfiles_owners
    }

    /// Graph keys of everything `key` directly depends on.
    pub fn direct_deps(&self, key: &ActionKey) -> Result<HashSet<NodeKey>> {
        let action = self
            .actions
            .get(key)
            .ok_or_else(|| RewindError::ActionNotFound(key.to_string()))?;
        Ok(action.inputs.iter().map(|a| a.node_key()).collect())
    }

    /// Mark a node done, computing a fresh value for it.
    pub fn complete(&self, node: &NodeKey) -> NodeValue {
        let generation = {
            let mut entry = self.generations.entry(node.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        let mut hasher = Hasher::new();
        hasher.update(node.to_string().as_bytes());
        hasher.update(&generation.to_le_bytes());
        let value = NodeValue {
            digest: hasher.finalize().to_hex().to_string(),
        };

        trace!(node = %node, generation, "node completed");
        self.done.insert(node.clone(), value.clone());
        value
    }

    /// Mark every node done.
    pub fn complete_all(&self) {
        for node in self.nodes() {
            self.complete(&node);
        }
    }

    /// Number of evaluations `node` has finished.
    pub fn generation(&self, node: &NodeKey) -> u64 {
        self.generations.get(node).map(|g| *g).unwrap_or(0)
    }

    /// Current content digest of the artifact at `exec_path`, if done.
    pub fn digest_of(&self, exec_path: &str) -> Option<String> {
        self.value_if_done(&NodeKey::artifact(exec_path))
            .map(|v| v.digest)
    }

    /// Invalidate every node of the directive.
    ///
    /// Idempotent: a node that is already not done is left alone. Returns the
    /// number of nodes this call invalidated.
    pub fn restart(&self, restart: &Restart) -> usize {
        let mut invalidated = 0;
        for node in restart.nodes() {
            if self.done.remove(node).is_some() {
                invalidated += 1;
            }
        }
        debug!(
            requested = restart.len(),
            invalidated, "applied restart directive"
        );
        invalidated
    }
}

impl GraphAccessor for InMemoryGraph {
    fn is_done(&self, node: &NodeKey) -> bool {
        self.done.contains_key(node)
    }

    fn value_if_done(&self, node: &NodeKey) -> Option<NodeValue> {
        self.done.get(node).map(|v| v.value().clone())
    }

    fn discover_dependencies(&self, artifact: &Artifact) -> Result<Option<ArtifactDependencies>> {
        let deps = self
            .producers
            .get(&artifact.exec_path)
            .ok_or_else(|| RewindError::UnknownArtifact(artifact.exec_path.clone()))?;

        let all_done = deps
            .action_execution_keys()
            .into_iter()
            .all(|key| self.is_done(&NodeKey::Action(key)));

        Ok(all_done.then(|| deps.clone()))
    }

    fn lookup_action(&self, key: &ActionKey) -> Result<Arc<Action>> {
        self.actions
            .get(key)
            .cloned()
            .ok_or_else(|| RewindError::ActionNotFound(key.to_string()))
    }
}
