// src/rewind/bug_report.rs

//! Reporting channel for engine defects detected while rewinding.
//!
//! Defects still fail the current computation; the reporter only decides
//! where the crash signal goes.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::error;

use crate::types::BugReportMode;

pub trait BugReporter: Send + Sync + Debug {
    fn report(&self, message: &str);
}

/// Logs defects at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBugReporter;

impl BugReporter for LoggingBugReporter {
    fn report(&self, message: &str) {
        error!(bug = %message, "bug report");
    }
}

/// Crashes on the first defect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingBugReporter;

impl BugReporter for PanickingBugReporter {
    fn report(&self, message: &str) {
        panic!("bug report: {message}");
    }
}

pub fn reporter_for(mode: BugReportMode) -> Arc<dyn BugReporter> {
    match mode {
        BugReportMode::Log => Arc::new(LoggingBugReporter),
        BugReportMode::Panic => Arc::new(PanickingBugReporter),
    }
}
