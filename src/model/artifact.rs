// src/model/artifact.rs

use std::fmt;

use serde::Deserialize;

use crate::model::key::NodeKey;

/// What kind of artifact a path names.
///
/// Only `Source` artifacts are not producible by an action. `Tree` covers
/// tree artifacts and filesets; `Runfiles` covers runfiles collections. Both
/// own individually addressable members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Source,
    Derived,
    Tree,
    Runfiles,
}

impl Default for ArtifactKind {
    fn default() -> Self {
        ArtifactKind::Derived
    }
}

/// A named thing in the build: a source file, or an output of an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Artifact {
    pub exec_path: String,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(exec_path: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            exec_path: exec_path.into(),
            kind,
        }
    }

    pub fn source(exec_path: impl Into<String>) -> Self {
        Self::new(exec_path, ArtifactKind::Source)
    }

    pub fn derived(exec_path: impl Into<String>) -> Self {
        Self::new(exec_path, ArtifactKind::Derived)
    }

    pub fn tree(exec_path: impl Into<String>) -> Self {
        Self::new(exec_path, ArtifactKind::Tree)
    }

    pub fn runfiles(exec_path: impl Into<String>) -> Self {
        Self::new(exec_path, ArtifactKind::Runfiles)
    }

    pub fn is_source(&self) -> bool {
        self.kind == ArtifactKind::Source
    }

    pub fn node_key(&self) -> NodeKey {
        NodeKey::Artifact(self.exec_path.clone())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exec_path)
    }
}

/// Anything an action may read while executing.
///
/// Most inputs are artifacts. `Virtual` inputs (parameter files, members of
/// a tree artifact or runfiles collection) are not graph nodes themselves but
/// share the exec-path namespace with artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionInput {
    Artifact(Artifact),
    Virtual { exec_path: String },
}

impl ActionInput {
    pub fn virtual_input(exec_path: impl Into<String>) -> Self {
        ActionInput::Virtual {
            exec_path: exec_path.into(),
        }
    }

    pub fn exec_path(&self) -> &str {
        match self {
            ActionInput::Artifact(a) => &a.exec_path,
            ActionInput::Virtual { exec_path } => exec_path,
        }
    }

    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            ActionInput::Artifact(a) => Some(a),
            ActionInput::Virtual { .. } => None,
        }
    }

    /// Graph key this input would have if it were a direct dependency.
    pub fn node_key(&self) -> NodeKey {
        NodeKey::Artifact(self.exec_path().to_string())
    }
}

impl From<Artifact> for ActionInput {
    fn from(artifact: Artifact) -> Self {
        ActionInput::Artifact(artifact)
    }
}

impl fmt::Display for ActionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.exec_path())
    }
}
