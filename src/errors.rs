// src/errors.rs

//! Crate-wide error types.
//!
//! Two families live side by side:
//! - expected build failures ([`ActionExecutionError`]), reported to the user
//!   and handled by the executor like any other failed action;
//! - defects ([`RewindError::InvariantViolation`]), which indicate a bug in the
//!   graph engine rather than in the build and are never recovered from.

use std::fmt;

use thiserror::Error;

use crate::model::ActionKey;
use crate::rewind::LostInputsFailure;

#[derive(Error, Debug)]
pub enum RewindError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cycle detected in action graph: {0}")]
    GraphCycle(String),

    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("Unknown artifact: {0}")]
    UnknownArtifact(String),

    #[error(transparent)]
    Execution(#[from] ActionExecutionError),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("rewind computation interrupted")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RewindError {
    /// True for errors that indicate an engine bug rather than a build problem.
    pub fn is_defect(&self) -> bool {
        matches!(self, RewindError::InvariantViolation(_))
    }

    /// The execution failure kind, if this is an ordinary build failure.
    pub fn execution_kind(&self) -> Option<ExecutionFailureKind> {
        match self {
            RewindError::Execution(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Why a lost-input failure could not be repaired by rewinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionFailureKind {
    /// The same action lost the same input (by digest) twice in one build.
    RepeatedLoss,
    /// A lost input maps to a source artifact, which no action can regenerate.
    SourceArtifactLost,
    /// The action has already been rewound the maximum number of times.
    RewindLimitExceeded,
}

impl fmt::Display for ExecutionFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionFailureKind::RepeatedLoss => "lost the same input twice",
            ExecutionFailureKind::SourceArtifactLost => "lost a source artifact",
            ExecutionFailureKind::RewindLimitExceeded => "exceeded the rewind limit",
        };
        f.write_str(s)
    }
}

/// Ordinary action execution failure, carrying the original lost-input
/// failure so the user sees what went missing.
#[derive(Error, Debug, Clone)]
#[error("action {action} ({mnemonic}) {kind}: {cause}")]
pub struct ActionExecutionError {
    pub action: ActionKey,
    pub mnemonic: String,
    pub kind: ExecutionFailureKind,
    pub cause: LostInputsFailure,
    /// Whether the failure should stop the whole build immediately.
    pub catastrophe: bool,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RewindError>;
