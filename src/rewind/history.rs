// src/rewind/history.rs

use dashmap::DashSet;
use tracing::{debug, warn};

use crate::errors::{ActionExecutionError, ExecutionFailureKind, Result};
use crate::model::{Action, ActionKey};
use crate::rewind::bug_report::BugReporter;
use crate::rewind::lost_inputs::LostInputsFailure;

/// A failed action lost an input with the given digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LostInputRecord {
    pub failed_action: ActionKey,
    pub lost_input_digest: String,
}

impl LostInputRecord {
    pub fn new(failed_action: ActionKey, lost_input_digest: impl Into<String>) -> Self {
        Self {
            failed_action,
            lost_input_digest: lost_input_digest.into(),
        }
    }
}

/// Every (action, lost input digest) pair seen during the current build.
///
/// Shared by all concurrently failing actions. Insertion is atomic per
/// record, so of two concurrent insertions of the same pair exactly one
/// succeeds. Cleared by [`LostInputHistory::reset`] when a new build starts.
#[derive(Debug, Default)]
pub struct LostInputHistory {
    records: DashSet<LostInputRecord>,
}

impl LostInputHistory {
    pub fn new() -> Self {
        Self {
            records: DashSet::new(),
        }
    }

    /// Insert the record; `false` if it was already present.
    pub fn record(&self, failed_action: &ActionKey, digest: &str) -> bool {
        self.records
            .insert(LostInputRecord::new(failed_action.clone(), digest))
    }

    pub fn contains(&self, failed_action: &ActionKey, digest: &str) -> bool {
        self.records
            .contains(&LostInputRecord::new(failed_action.clone(), digest))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget every record. Only called between builds.
    pub fn reset(&self) {
        debug!(records = self.records.len(), "clearing lost input history");
        self.records.clear();
    }

    /// Record every lost digest of `failure` for `failed_key`.
    ///
    /// The same action losing the same input twice means it was retried
    /// before the action generating that input reran, which rewinding should
    /// have prevented. That is reported as a bug and fails the action with
    /// the original failure attached.
    pub fn check_not_repeated(
        &self,
        failed_action: &Action,
        failed_key: &ActionKey,
        failure: &LostInputsFailure,
        reporter: &dyn BugReporter,
    ) -> Result<()> {
        for (digest, lost_input) in failure.lost_inputs.iter() {
            if self.record(failed_key, digest) {
                continue;
            }

            warn!(
                action = %failed_key,
                lost_input = %lost_input,
                digest = %digest,
                "action lost the same input twice"
            );
            reporter.report(&format!(
                "lost input twice for the same action. lost_input: {}, lost_input digest: {}, \
                 failed_action: {}",
                lost_input, digest, failed_key
            ));
            return Err(ActionExecutionError {
                action: failed_key.clone(),
                mnemonic: failed_action.mnemonic.clone(),
                kind: ExecutionFailureKind::RepeatedLoss,
                cause: failure.clone(),
                catastrophe: false,
            }
            .into());
        }

        Ok(())
    }
}
