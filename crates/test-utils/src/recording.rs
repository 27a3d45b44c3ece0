use std::sync::{Arc, Mutex};

use rewind::rewind::BugReporter;

/// Bug reporter that keeps every report for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingBugReporter {
    reports: Arc<Mutex<Vec<String>>>,
}

impl RecordingBugReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl BugReporter for RecordingBugReporter {
    fn report(&self, message: &str) {
        self.reports.lock().unwrap().push(message.to_string());
    }
}
