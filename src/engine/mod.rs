// src/engine/mod.rs

//! Executor-side handling of lost-input failures.
//!
//! This module ties together:
//! - the rewind strategy (what to restart)
//! - the evaluation graph (restarting nodes)
//! - the action state cache (forgetting previous executions)
//! - per-build bookkeeping (lost input history, rewind attempt limits)
//!
//! The synchronous core lives in [`core`]; the async shell that lets many
//! failing actions compute their plans concurrently is in [`runtime`].

use crate::model::ActionKey;
use crate::rewind::{LostInputsFailure, RewindPlan};

/// An action failed because some of its inputs were lost.
#[derive(Debug, Clone)]
pub struct ActionFailure {
    pub action: ActionKey,
    pub failure: LostInputsFailure,
}

impl ActionFailure {
    pub fn new(action: ActionKey, failure: LostInputsFailure) -> Self {
        Self { action, failure }
    }
}

/// Options for a build session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// How many times one action may be rewound within a single build.
    pub max_rewinds_per_action: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_rewinds_per_action: 10,
        }
    }
}

/// Result of applying a rewind plan.
#[derive(Debug, Clone)]
pub struct RewindOutcome {
    pub plan: RewindPlan,
    /// Nodes that this rewind invalidated (nodes already restarting by a
    /// concurrent rewind are not counted).
    pub newly_invalidated: usize,
    /// Cached action states evicted, the failed action's included.
    pub evicted: usize,
    /// How many times the failed action has now been rewound this build.
    pub attempt: u32,
}

/// Events flowing into the session runtime.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new build starts; per-build history must be cleared.
    BuildStarted,
    /// An action reported lost inputs.
    LostInputs(ActionFailure),
    /// The build was aborted; in-flight rewinds must stop.
    Cancelled,
    /// Stop the runtime loop.
    ShutdownRequested,
}

pub mod cache;
pub mod core;
pub mod runtime;

pub use cache::{ActionState, ActionStateCache};
pub use self::core::RewindCore;
pub use runtime::{Runtime, SessionReport, handle_concurrently};
