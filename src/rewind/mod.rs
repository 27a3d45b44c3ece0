// src/rewind/mod.rs

//! Action rewinding: deciding what to restart when an action loses inputs.
//!
//! - [`history`] remembers which inputs each action already lost this build.
//! - [`owners`] ties low-level lost inputs to the failed action's direct deps.
//! - [`walker`] expands the restart set through input-propagating actions.
//! - [`plan`] packages the result for the executor.
//! - [`strategy`] runs the whole computation for one failure.
//! - [`bug_report`] carries defect signals out of the computation.

pub mod bug_report;
pub mod history;
pub mod lost_inputs;
pub mod owners;
pub mod plan;
pub mod strategy;
pub mod walker;

pub use bug_report::{BugReporter, LoggingBugReporter, PanickingBugReporter, reporter_for};
pub use history::{LostInputHistory, LostInputRecord};
pub use lost_inputs::LostInputsFailure;
pub use owners::{LostInputsByOwner, OwnerLookup, OwnerMap, OwnershipResolver};
pub use plan::{RewindPlan, RewindPlanBuilder};
pub use strategy::ActionRewindStrategy;
pub use walker::PropagationWalker;
