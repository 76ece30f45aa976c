use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Statuses, item kinds, and issue tags shared by the tracker and the backend
// ============================================================================

/// Final status of a reported item.
///
/// A finish request may carry no status at all: an aggregating node with
/// descendants leaves its status unset and lets the server derive it from
/// the children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

/// Item kind as understood by the reporting server.
///
/// Examples (individual data-row runs and masked stand-ins alike) are
/// reported with the `Scenario` kind; the scenario node itself is never a
/// server-side item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Suite,
    BeforeSuite,
    BeforeEach,
    Scenario,
    AfterEach,
    AfterSuite,
}

/// Issue tag attached to a finish request so the server does not flag the
/// item for investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueTag {
    NotAnIssue,
}

/// Severity of a forwarded log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Launch visibility mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    Default,
    Debug,
}

impl Default for LaunchMode {
    fn default() -> Self {
        LaunchMode::Default
    }
}

/// Milliseconds since the Unix epoch, used as item finish and log times.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
