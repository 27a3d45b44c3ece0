use std::str::FromStr;
use serde::Deserialize;

/// Where bug reports (engine defects detected during rewinding) go.
///
/// - `Log`: log the defect at error level and keep going; the caller still
///   receives the failure (default behaviour).
/// - `Panic`: crash immediately. Useful in tests and CI, where a defect should
///   never be mistaken for an ordinary build failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BugReportMode {
    Log,
    Panic,
}

impl Default for BugReportMode {
    fn default() -> Self {
        BugReportMode::Log
    }
}

impl FromStr for BugReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(BugReportMode::Log),
            "panic" => Ok(BugReportMode::Panic),
            other => Err(format!(
                "invalid bug_report: {other} (expected \"log\" or \"panic\")"
            )),
        }
    }
}
