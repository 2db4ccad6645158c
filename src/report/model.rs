// src/report/model.rs

//! Serde model of the runner's result artifact.
//!
//! The artifact is read-only once parsed and lives for one run's
//! processing. Unknown fields are ignored so older/newer runners keep
//! working; every optional field defaults rather than failing the parse.

use serde::Deserialize;

/// The whole artifact: one invocation's outcome.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultArtifact {
    pub summary: RunSummary,
    #[serde(default)]
    pub tests: Vec<TestResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    #[serde(default)]
    pub duration_ms: u64,
}

/// One executed test (data-driven variants appear as separate entries).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: String,
    #[serde(default)]
    pub test_name: String,
    pub success: bool,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl TestResult {
    /// Preferred display name.
    pub fn display_name(&self) -> &str {
        if self.test_name.is_empty() {
            &self.test_id
        } else {
            &self.test_name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Trace,
    Assertion,
    Log,
    Metric,
    Error,
    Status,
    StepStart,
    StepEnd,
    Warning,
}

/// Terminal state a `step_end` event reports for its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Passed,
    Failed,
}

/// One entry of a test's flat event stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub expected: Option<serde_json::Value>,
    #[serde(default)]
    pub actual: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    /// Step index on `step_start` / `step_end` markers.
    #[serde(default)]
    pub index: Option<u64>,
    /// Out-of-bracket step attribution (trace, metric).
    #[serde(default)]
    pub step_index: Option<u64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub status: Option<StepState>,
}

impl Event {
    /// Whether this is an assertion that failed.
    pub fn is_failed_assertion(&self) -> bool {
        self.kind == EventKind::Assertion && self.passed == Some(false)
    }
}

/// Parse an artifact from its JSON text.
///
/// Callers treat a parse failure as "not ready yet": the runner writes the
/// file in one go, but the watcher may observe it mid-write.
pub fn parse_artifact(text: &str) -> serde_json::Result<ResultArtifact> {
    serde_json::from_str(text)
}

/// Render a JSON payload (expected/actual) for humans: bare strings lose
/// their quotes, everything else keeps its JSON form.
pub fn payload_to_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
