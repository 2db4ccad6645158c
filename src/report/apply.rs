// src/report/apply.rs

//! Apply one artifact's results to the host's test items.

use tracing::{debug, warn};

use crate::types::RunStatus;

use super::model::{payload_to_display, Event, EventKind, ResultArtifact, StepState, TestResult};
use super::steps::correlate_steps;
use super::{FailureMessage, ReportSink, ResultMatcher, SourceLocation, TestItem};

/// Default matcher: exact test id, or a data-driven variant of it
/// (`"checkout"` matches `"checkout"` and `"checkout[2]"`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TestIdMatcher;

impl ResultMatcher for TestIdMatcher {
    fn matches(&self, item: &TestItem, result: &TestResult) -> bool {
        result.test_id == item.id
            || (result.test_id.starts_with(&item.id)
                && result.test_id[item.id.len()..].starts_with('['))
    }
}

/// Match items against artifact results and push verdicts, failures and
/// summaries into the sink.
///
/// - An item with zero matching results is marked skipped.
/// - Matched items aggregate success (AND) and duration (SUM) over their
///   matches; data-driven variants share one declared item.
/// - Passing items still forward their event summary, so passing tests
///   retain visible logs and traces.
pub fn apply_results(
    items: &[TestItem],
    artifact: &ResultArtifact,
    matcher: &dyn ResultMatcher,
    sink: &mut dyn ReportSink,
) {
    for item in items {
        let matches: Vec<&TestResult> = artifact
            .tests
            .iter()
            .filter(|result| matcher.matches(item, result))
            .collect();

        if matches.is_empty() {
            debug!(item = %item.id, "no matching results; marking skipped");
            sink.item_status(item, RunStatus::Skipped);
            continue;
        }

        apply_matches(item, &matches, sink);
    }
}

fn apply_matches(item: &TestItem, matches: &[&TestResult], sink: &mut dyn ReportSink) {
    let success = matches.iter().all(|r| r.success);
    let duration_ms: u64 = matches.iter().map(|r| r.duration_ms).sum();
    let display = matches
        .iter()
        .map(|r| r.display_name())
        .collect::<Vec<_>>()
        .join(", ");

    let summary = matches
        .iter()
        .map(|r| summarize_events(&r.events))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if success {
        debug!(item = %item.id, duration_ms, "all matching results passed");
        sink.item_status(item, RunStatus::Passed);
        if !summary.is_empty() {
            sink.output(&summary);
        }
        return;
    }

    warn!(item = %item.id, results = matches.len(), "matching results report failure");

    let mut failures = Vec::new();
    for result in matches {
        failures.extend(collect_failures(&result.events, item.location.clone()));
    }
    if failures.is_empty() {
        // No explicit failure event anywhere; fall back to a generic verdict.
        failures.push(FailureMessage {
            text: "Test failed".to_string(),
            expected: None,
            actual: None,
            location: item.location.clone(),
        });
    }
    for failure in failures {
        sink.failure(item, failure);
    }

    // Supplementary full event summary, always.
    if !summary.is_empty() {
        sink.failure(
            item,
            FailureMessage::text(format!("{display}\n{summary}")),
        );
    }

    // Step verdicts come from the first matched result only; data-driven
    // variants are assumed structurally identical.
    apply_steps(item, matches[0], sink);

    sink.item_status(item, RunStatus::Failed);
}

fn apply_steps(item: &TestItem, result: &TestResult, sink: &mut dyn ReportSink) {
    for step in correlate_steps(&result.events) {
        if step.status != Some(StepState::Failed) {
            continue;
        }

        // Steps have no independent location; failures carry the parent
        // test's.
        let mut failures = collect_failures(&step.events, item.location.clone());
        if failures.is_empty() {
            failures.push(FailureMessage {
                text: format!("Step {} failed", step.index),
                expected: None,
                actual: None,
                location: item.location.clone(),
            });
        }
        for mut failure in failures {
            failure.text = format!("step {}: {}", step.index, failure.text);
            sink.failure(item, failure);
        }

        let summary = summarize_events(&step.events);
        if !summary.is_empty() {
            let mut supplementary =
                FailureMessage::text(format!("step {} events:\n{}", step.index, summary));
            supplementary.location = item.location.clone();
            sink.failure(item, supplementary);
        }
    }
}

/// Assertion failures (with expected/actual payloads) and explicit error
/// events, in stream order.
fn collect_failures(events: &[Event], location: Option<SourceLocation>) -> Vec<FailureMessage> {
    let mut failures = Vec::new();

    for event in events {
        if event.is_failed_assertion() {
            failures.push(FailureMessage {
                text: event
                    .message
                    .clone()
                    .unwrap_or_else(|| "assertion failed".to_string()),
                expected: event.expected.as_ref().map(payload_to_display),
                actual: event.actual.as_ref().map(payload_to_display),
                location: location.clone(),
            });
        } else if event.kind == EventKind::Error {
            let text = event
                .error
                .clone()
                .or_else(|| event.message.clone())
                .unwrap_or_else(|| "error".to_string());
            failures.push(FailureMessage {
                text,
                expected: None,
                actual: None,
                location: location.clone(),
            });
        }
    }

    failures
}

/// Human-readable, line-per-event rendering of an event stream.
///
/// Events with no printable content contribute nothing; an empty return
/// means there is nothing worth forwarding.
pub fn summarize_events(events: &[Event]) -> String {
    let mut lines = Vec::new();

    for event in events {
        match event.kind {
            EventKind::Trace => {
                if let Some(msg) = &event.message {
                    lines.push(format!("trace: {msg}"));
                }
            }
            EventKind::Log => {
                if let Some(msg) = &event.message {
                    lines.push(format!("log: {msg}"));
                }
            }
            EventKind::Metric => {
                if let Some(msg) = &event.message {
                    lines.push(format!("metric: {msg}"));
                }
            }
            EventKind::Status => {
                if let Some(msg) = &event.message {
                    lines.push(format!("status: {msg}"));
                }
            }
            EventKind::Warning => {
                if let Some(msg) = &event.message {
                    lines.push(format!("warning: {msg}"));
                }
            }
            EventKind::Error => {
                if let Some(err) = event.error.as_ref().or(event.message.as_ref()) {
                    lines.push(format!("error: {err}"));
                }
            }
            EventKind::Assertion => {
                let verdict = if event.passed == Some(false) {
                    "failed"
                } else {
                    "passed"
                };
                let msg = event.message.as_deref().unwrap_or("assertion");
                let mut line = format!("assertion {verdict}: {msg}");
                if let (Some(expected), Some(actual)) = (&event.expected, &event.actual) {
                    line.push_str(&format!(
                        " (expected {}, actual {})",
                        payload_to_display(expected),
                        payload_to_display(actual)
                    ));
                }
                lines.push(line);
            }
            EventKind::StepStart => {
                if let Some(index) = event.index {
                    lines.push(format!("step {index} started"));
                }
            }
            EventKind::StepEnd => {
                if let Some(index) = event.index {
                    let status = match event.status {
                        Some(StepState::Passed) => "passed",
                        Some(StepState::Failed) => "failed",
                        None => "ended",
                    };
                    lines.push(format!("step {index} {status}"));
                }
            }
        }
    }

    lines.join("\n")
}
