// src/rewind/lost_inputs.rs

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{ActionInput, Artifact};
use crate::rewind::owners::OwnerMap;

/// Failure reported by the executor when an action could not read some of
/// its inputs.
///
/// Lost inputs are keyed by content digest. `input_owners` maps members of
/// tree artifacts and filesets to the collection that owns them.
#[derive(Debug, Clone, Default)]
pub struct LostInputsFailure {
    pub lost_inputs: BTreeMap<String, ActionInput>,
    pub input_owners: OwnerMap,
    pub message: String,
}

impl LostInputsFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            lost_inputs: BTreeMap::new(),
            input_owners: OwnerMap::new(),
            message: message.into(),
        }
    }

    pub fn with_lost(mut self, digest: impl Into<String>, input: impl Into<ActionInput>) -> Self {
        self.lost_inputs.insert(digest.into(), input.into());
        self
    }

    pub fn with_owner(mut self, member: impl Into<String>, owner: Artifact) -> Self {
        self.input_owners.insert(member, owner);
        self
    }

    pub fn digests(&self) -> impl Iterator<Item = &str> {
        self.lost_inputs.keys().map(|d| d.as_str())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &ActionInput> {
        self.lost_inputs.values()
    }

    pub fn input_for_digest(&self, digest: &str) -> Option<&ActionInput> {
        self.lost_inputs.get(digest)
    }
}

impl fmt::Display for LostInputsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (lost inputs:", self.message)?;
        for input in self.lost_inputs.values() {
            write!(f, " {input}")?;
        }
        f.write_str(")")
    }
}
