// src/config/model.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::model::{ActionKey, Artifact, ArtifactKind, NodeKey};
use crate::types::BugReportMode;

/// Graph description exactly as read from a TOML file.
///
/// ```toml
/// [config]
/// bug_report = "log"
/// max_rewinds_per_action = 10
///
/// [artifact."out/tree"]
/// kind = "tree"
/// members = ["out/tree/a.txt"]
///
/// [action."//pkg:gen#0"]
/// mnemonic = "Genrule"
/// inputs = ["src/gen.sh"]
/// outputs = ["out/tree"]
/// ```
///
/// Use `ConfigFile::try_from` to validate it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Explicitly declared artifacts from `[artifact."<exec path>"]`.
    ///
    /// Paths that are only mentioned as inputs/outputs need not be declared.
    #[serde(default)]
    pub artifact: BTreeMap<String, ArtifactConfig>,

    /// All actions from `[action."<owner>#<index>"]`.
    #[serde(default)]
    pub action: BTreeMap<String, ActionConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub bug_report: BugReportMode,

    /// How many times a single action may be rewound within one build before
    /// its lost-input failure is reported as an ordinary build failure.
    #[serde(default = "default_max_rewinds_per_action")]
    pub max_rewinds_per_action: u32,
}

fn default_max_rewinds_per_action() -> u32 {
    10
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            bug_report: BugReportMode::default(),
            max_rewinds_per_action: default_max_rewinds_per_action(),
        }
    }
}

/// `[artifact."<exec path>"]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default)]
    pub kind: ArtifactKind,

    /// Exec paths owned by this tree artifact / fileset / runfiles collection.
    #[serde(default)]
    pub members: Vec<String>,

    /// For trees produced by an action template: the keys of the actions the
    /// template expanded to.
    #[serde(default)]
    pub expanded_actions: Vec<String>,
}

/// `[action."<owner>#<index>"]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    #[serde(default = "default_mnemonic")]
    pub mnemonic: String,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    /// Whether the action may pass an unpredictable subset of its inputs
    /// through to its outputs.
    #[serde(default)]
    pub propagates_inputs: bool,

    /// Extra graph nodes to restart with this action. Entries that parse as
    /// action keys name action nodes, exec paths of graph artifacts name
    /// artifact nodes, and anything else names an opaque node.
    #[serde(default)]
    pub rewind_deps: Vec<String>,
}

fn default_mnemonic() -> String {
    "Action".to_string()
}

impl ActionConfig {
    pub fn rewind_dep_keys(&self) -> Vec<NodeKey> {
        self.rewind_deps
            .iter()
            .map(|dep| match dep.parse::<ActionKey>() {
                Ok(key) => NodeKey::Action(key),
                Err(_) => NodeKey::Other(dep.clone()),
            })
            .collect()
    }
}

/// Validated graph description.
///
/// Only constructible through `TryFrom<RawConfigFile>`, which guarantees that
/// action keys parse, every derived artifact has exactly one producer and the
/// action graph is acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub artifact: BTreeMap<String, ArtifactConfig>,
    pub action: BTreeMap<ActionKey, ActionConfig>,
    producers: BTreeMap<String, ActionKey>,
    expansions: BTreeMap<String, BTreeSet<ActionKey>>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        artifact: BTreeMap<String, ArtifactConfig>,
        action: BTreeMap<ActionKey, ActionConfig>,
        producers: BTreeMap<String, ActionKey>,
        expansions: BTreeMap<String, BTreeSet<ActionKey>>,
    ) -> Self {
        Self {
            config,
            artifact,
            action,
            producers,
            expansions,
        }
    }

    /// Resolve an exec path to an artifact.
    ///
    /// Declared artifacts keep their declared kind. Undeclared paths are
    /// derived when some action outputs them, and source otherwise.
    pub fn artifact_for(&self, exec_path: &str) -> Artifact {
        let kind = match self.artifact.get(exec_path) {
            Some(cfg) => cfg.kind,
            None if self.producers.contains_key(exec_path) => ArtifactKind::Derived,
            None => ArtifactKind::Source,
        };
        Artifact::new(exec_path, kind)
    }

    /// The single action that outputs `exec_path`, if any.
    pub fn producer_of(&self, exec_path: &str) -> Option<&ActionKey> {
        self.producers.get(exec_path)
    }

    /// The template expansion producing the tree at `exec_path`, if any.
    pub fn expansion_of(&self, exec_path: &str) -> Option<&BTreeSet<ActionKey>> {
        self.expansions.get(exec_path)
    }

    /// Every exec path mentioned anywhere as an artifact (not members).
    pub fn artifact_paths(&self) -> BTreeSet<&str> {
        let mut paths: BTreeSet<&str> = self.artifact.keys().map(|s| s.as_str()).collect();
        for action in self.action.values() {
            paths.extend(action.inputs.iter().map(|s| s.as_str()));
            paths.extend(action.outputs.iter().map(|s| s.as_str()));
        }
        paths
    }
}
