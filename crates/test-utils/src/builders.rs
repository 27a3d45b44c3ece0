#![allow(dead_code)]

use std::collections::BTreeMap;

use rewind::config::{ActionConfig, ArtifactConfig, ConfigFile, ConfigSection, RawConfigFile};
use rewind::graph::InMemoryGraph;
use rewind::model::ArtifactKind;
use rewind::types::BugReportMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct GraphBuilder {
    config: RawConfigFile,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                artifact: BTreeMap::new(),
                action: BTreeMap::new(),
            },
        }
    }

    pub fn with_action(mut self, key: &str, action: ActionConfig) -> Self {
        self.config.action.insert(key.to_string(), action);
        self
    }

    pub fn with_artifact(mut self, path: &str, artifact: ArtifactConfig) -> Self {
        self.config.artifact.insert(path.to_string(), artifact);
        self
    }

    pub fn with_source(self, path: &str) -> Self {
        self.with_artifact(
            path,
            ArtifactConfig {
                kind: ArtifactKind::Source,
                ..ArtifactConfig::default()
            },
        )
    }

    /// Tree artifact or fileset owning `members`.
    pub fn with_tree(self, path: &str, members: &[&str]) -> Self {
        self.with_artifact(path, collection(ArtifactKind::Tree, members))
    }

    /// Tree artifact produced by the actions an action template expanded to.
    pub fn with_template_tree(self, path: &str, members: &[&str], expanded: &[&str]) -> Self {
        let mut artifact = collection(ArtifactKind::Tree, members);
        artifact.expanded_actions = expanded.iter().map(|s| s.to_string()).collect();
        self.with_artifact(path, artifact)
    }

    pub fn with_runfiles(self, path: &str, members: &[&str]) -> Self {
        self.with_artifact(path, collection(ArtifactKind::Runfiles, members))
    }

    pub fn with_max_rewinds(mut self, max: u32) -> Self {
        self.config.config.max_rewinds_per_action = max;
        self
    }

    pub fn with_bug_report(mut self, mode: BugReportMode) -> Self {
        self.config.config.bug_report = mode;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid graph from builder")
    }

    /// Build the graph with every node already evaluated once.
    pub fn build_graph(self) -> InMemoryGraph {
        let graph = InMemoryGraph::from_config(&self.build());
        graph.complete_all();
        graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn collection(kind: ArtifactKind, members: &[&str]) -> ArtifactConfig {
    ArtifactConfig {
        kind,
        members: members.iter().map(|s| s.to_string()).collect(),
        expanded_actions: Vec::new(),
    }
}

/// Builder for `ActionConfig`.
pub struct ActionConfigBuilder {
    action: ActionConfig,
}

impl ActionConfigBuilder {
    pub fn new(mnemonic: &str) -> Self {
        Self {
            action: ActionConfig {
                mnemonic: mnemonic.to_string(),
                inputs: vec![],
                outputs: vec![],
                propagates_inputs: false,
                rewind_deps: vec![],
            },
        }
    }

    pub fn input(mut self, path: &str) -> Self {
        self.action.inputs.push(path.to_string());
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.action.outputs.push(path.to_string());
        self
    }

    pub fn propagates_inputs(mut self) -> Self {
        self.action.propagates_inputs = true;
        self
    }

    pub fn rewind_dep(mut self, node: &str) -> Self {
        self.action.rewind_deps.push(node.to_string());
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}
