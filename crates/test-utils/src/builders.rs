#![allow(dead_code)]

use serde_json::{json, Value};

use runwatch::report::{SourceLocation, TestItem};

/// Builder for result-artifact JSON, keeping the summary consistent with
/// the tests it contains.
pub struct ArtifactBuilder {
    tests: Vec<Value>,
    passed: u64,
    failed: u64,
    skipped: u64,
    duration_ms: u64,
}

impl ArtifactBuilder {
    pub fn new() -> Self {
        Self {
            tests: Vec::new(),
            passed: 0,
            failed: 0,
            skipped: 0,
            duration_ms: 0,
        }
    }

    /// Add a test result; the summary counters follow its `success` flag.
    pub fn with_test(mut self, test: Value) -> Self {
        if test["success"].as_bool().unwrap_or(false) {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.duration_ms += test["durationMs"].as_u64().unwrap_or(0);
        self.tests.push(test);
        self
    }

    pub fn with_skipped(mut self, count: u64) -> Self {
        self.skipped += count;
        self
    }

    pub fn build(self) -> Value {
        json!({
            "summary": {
                "total": self.passed + self.failed + self.skipped,
                "passed": self.passed,
                "failed": self.failed,
                "skipped": self.skipped,
                "durationMs": self.duration_ms,
            },
            "tests": self.tests,
        })
    }

    pub fn build_json(self) -> String {
        self.build().to_string()
    }
}

impl Default for ArtifactBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `tests[]` entry.
pub struct TestResultBuilder {
    id: String,
    name: String,
    success: bool,
    duration_ms: u64,
    events: Vec<Value>,
}

impl TestResultBuilder {
    pub fn passing(id: &str) -> Self {
        Self::new(id, true)
    }

    pub fn failing(id: &str) -> Self {
        Self::new(id, false)
    }

    fn new(id: &str, success: bool) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            success,
            duration_ms: 0,
            events: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    pub fn event(mut self, event: Value) -> Self {
        self.events.push(event);
        self
    }

    pub fn trace(self, message: &str) -> Self {
        self.event(json!({ "type": "trace", "message": message }))
    }

    pub fn trace_in_step(self, message: &str, step_index: u64) -> Self {
        self.event(json!({ "type": "trace", "message": message, "stepIndex": step_index }))
    }

    pub fn log(self, message: &str) -> Self {
        self.event(json!({ "type": "log", "message": message }))
    }

    pub fn assertion_failed(self, message: &str, expected: &str, actual: &str) -> Self {
        self.event(json!({
            "type": "assertion",
            "passed": false,
            "message": message,
            "expected": expected,
            "actual": actual,
        }))
    }

    pub fn error(self, error: &str) -> Self {
        self.event(json!({ "type": "error", "error": error }))
    }

    pub fn step_start(self, index: u64) -> Self {
        self.event(json!({ "type": "step_start", "index": index }))
    }

    pub fn step_end(self, index: u64, status: &str) -> Self {
        self.event(json!({ "type": "step_end", "index": index, "status": status }))
    }

    pub fn build(self) -> Value {
        json!({
            "testId": self.id,
            "testName": self.name,
            "success": self.success,
            "durationMs": self.duration_ms,
            "events": self.events,
        })
    }
}

/// A task source file mapping names to commands.
pub fn task_source(entries: &[(&str, &str)]) -> String {
    let mut map = serde_json::Map::new();
    for (name, command) in entries {
        map.insert(name.to_string(), Value::String(command.to_string()));
    }
    Value::Object(map).to_string()
}

/// A test item with no source location.
pub fn item(id: &str) -> TestItem {
    TestItem {
        id: id.to_string(),
        label: id.to_string(),
        location: None,
    }
}

/// A test item declared at the given location.
pub fn item_at(id: &str, file: &str, line: u32) -> TestItem {
    TestItem {
        id: id.to_string(),
        label: id.to_string(),
        location: Some(SourceLocation {
            file: file.to_string(),
            line,
        }),
    }
}
