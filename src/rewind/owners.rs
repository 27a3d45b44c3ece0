// src/rewind/owners.rs

//! Attribution of lost inputs to the failed action's direct dependencies.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::errors::{Result, RewindError};
use crate::model::{Action, ActionInput, Artifact, NodeKey};

/// Maps an exec path to the collection artifact that owns it.
pub trait OwnerLookup: Send + Sync {
    fn owner_of(&self, exec_path: &str) -> Option<&Artifact>;
}

/// Plain map-backed [`OwnerLookup`].
///
/// Used both for tree artifact / fileset membership and for runfiles
/// membership; the two relations are kept in separate maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerMap {
    owners: HashMap<String, Artifact>,
}

impl OwnerMap {
    pub fn new() -> Self {
        Self {
            owners: HashMap::new(),
        }
    }

    /// Record that `owner` owns `member`. Returns the previous owner, if any.
    pub fn insert(&mut self, member: impl Into<String>, owner: Artifact) -> Option<Artifact> {
        self.owners.insert(member.into(), owner)
    }

    pub fn with_owner(mut self, member: impl Into<String>, owner: Artifact) -> Self {
        self.insert(member, owner);
        self
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl OwnerLookup for OwnerMap {
    fn owner_of(&self, exec_path: &str) -> Option<&Artifact> {
        self.owners.get(exec_path)
    }
}

/// Responsible direct dependency → the lost inputs it accounts for.
pub type LostInputsByOwner = BTreeMap<Artifact, BTreeSet<ActionInput>>;

/// Maps lost inputs to the artifacts the failed action directly depends on.
pub struct OwnershipResolver<'a> {
    input_owners: &'a dyn OwnerLookup,
    runfiles_owners: &'a dyn OwnerLookup,
    direct_deps: &'a HashSet<NodeKey>,
}

impl<'a> OwnershipResolver<'a> {
    pub fn new(
        input_owners: &'a dyn OwnerLookup,
        runfiles_owners: &'a dyn OwnerLookup,
        direct_deps: &'a HashSet<NodeKey>,
    ) -> Self {
        Self {
            input_owners,
            runfiles_owners,
            direct_deps,
        }
    }

    fn is_direct_dep(&self, artifact: &Artifact) -> bool {
        self.direct_deps.contains(&artifact.node_key())
    }

    /// Group `lost_inputs` by the direct dependency responsible for each.
    ///
    /// Inputs that cannot be tied to a direct dependency are logged and left
    /// out; retrying the failed action is all that can be done for them.
    pub fn resolve<'i, I>(&self, lost_inputs: I, failed_action: &Action) -> Result<LostInputsByOwner>
    where
        I: IntoIterator<Item = &'i ActionInput>,
    {
        let mut by_owner = LostInputsByOwner::new();

        for lost_input in lost_inputs {
            if self.direct_deps.contains(&lost_input.node_key()) {
                let artifact = lost_input.as_artifact().ok_or_else(|| {
                    RewindError::InvariantViolation(format!(
                        "unexpected non-artifact lost input which is a dep of the current action. \
                         lost_input: {}, failed_action: {}",
                        lost_input, failed_action.key
                    ))
                })?;
                by_owner
                    .entry(artifact.clone())
                    .or_default()
                    .insert(lost_input.clone());
                continue;
            }

            let owner = self.input_owners.owner_of(lost_input.exec_path());
            if let Some(owner) = owner.filter(|o| self.is_direct_dep(o)) {
                debug!(
                    lost_input = %lost_input,
                    owner = %owner,
                    "lost input belongs to a tree artifact or fileset dep"
                );
                by_owner
                    .entry(owner.clone())
                    .or_default()
                    .insert(lost_input.clone());
                continue;
            }

            let runfiles_owner = self.runfiles_owners.owner_of(lost_input.exec_path());
            if let Some(runfiles_owner) = runfiles_owner.filter(|o| self.is_direct_dep(o)) {
                debug!(
                    lost_input = %lost_input,
                    owner = %runfiles_owner,
                    "lost input belongs to a runfiles dep"
                );
                by_owner
                    .entry(runfiles_owner.clone())
                    .or_default()
                    .insert(lost_input.clone());
                continue;
            }

            let transitive_owner =
                owner.and_then(|o| self.runfiles_owners.owner_of(&o.exec_path));
            if let Some(transitive_owner) = transitive_owner.filter(|o| self.is_direct_dep(o)) {
                debug!(
                    lost_input = %lost_input,
                    owner = %transitive_owner,
                    "lost input belongs to a tree artifact inside a runfiles dep"
                );
                by_owner
                    .entry(transitive_owner.clone())
                    .or_default()
                    .insert(lost_input.clone());
                continue;
            }

            info!(
                lost_input = %lost_input,
                owner = ?owner.map(|o| o.exec_path.as_str()),
                runfiles_owner = ?runfiles_owner.map(|o| o.exec_path.as_str()),
                runfiles_transitive_owner = ?transitive_owner.map(|o| o.exec_path.as_str()),
                failed_action = %failed_action.key,
                "lost input is not a dep of the failed action and can't be associated with one"
            );
        }

        Ok(by_owner)
    }
}
