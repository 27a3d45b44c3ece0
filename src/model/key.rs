// src/model/key.rs

use std::fmt;
use std::str::FromStr;

/// Stable identity of an action across restarts.
///
/// Rendered as `<owner>#<index>`, where `owner` is the label of the target
/// that registered the action and `index` its position among that target's
/// actions (e.g. `//pkg:lib#0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey {
    pub owner: String,
    pub index: u32,
}

impl ActionKey {
    pub fn new(owner: impl Into<String>, index: u32) -> Self {
        Self {
            owner: owner.into(),
            index,
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.index)
    }
}

impl FromStr for ActionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, index) = s
            .trim()
            .rsplit_once('#')
            .ok_or_else(|| format!("invalid action key: {s} (expected \"<owner>#<index>\")"))?;

        if owner.is_empty() {
            return Err(format!("invalid action key: {s} (empty owner)"));
        }

        let index = index
            .parse::<u32>()
            .map_err(|e| format!("invalid action key: {s} ({e})"))?;

        Ok(ActionKey::new(owner, index))
    }
}

/// Identity of a node in the evaluation graph.
///
/// Artifacts are keyed by exec path. `Other` covers nodes that are neither
/// artifacts nor actions but that graph-aware actions ask to have restarted
/// alongside them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Artifact(String),
    Action(ActionKey),
    Other(String),
}

impl NodeKey {
    pub fn artifact(exec_path: impl Into<String>) -> Self {
        NodeKey::Artifact(exec_path.into())
    }

    pub fn as_action(&self) -> Option<&ActionKey> {
        match self {
            NodeKey::Action(key) => Some(key),
            _ => None,
        }
    }
}

impl From<ActionKey> for NodeKey {
    fn from(key: ActionKey) -> Self {
        NodeKey::Action(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Artifact(path) => write!(f, "artifact:{path}"),
            NodeKey::Action(key) => write!(f, "action:{key}"),
            NodeKey::Other(name) => write!(f, "node:{name}"),
        }
    }
}
