use runwatch::report::{FailureMessage, ReportSink, TestItem};
use runwatch::types::RunStatus;

/// Sink that records everything the core pushes at it, for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub task_statuses: Vec<(String, RunStatus)>,
    pub item_statuses: Vec<(String, RunStatus)>,
    pub outputs: Vec<String>,
    pub failures: Vec<(String, FailureMessage)>,
    pub debug_targets: Vec<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded status for the named task.
    pub fn task_status_of(&self, task: &str) -> Option<RunStatus> {
        self.task_statuses
            .iter()
            .rev()
            .find(|(name, _)| name == task)
            .map(|(_, status)| *status)
    }

    /// Last recorded status for the identified item.
    pub fn item_status_of(&self, item_id: &str) -> Option<RunStatus> {
        self.item_statuses
            .iter()
            .rev()
            .find(|(id, _)| id == item_id)
            .map(|(_, status)| *status)
    }

    /// All failure texts recorded for the identified item.
    pub fn failure_texts_of(&self, item_id: &str) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|(id, _)| id == item_id)
            .map(|(_, message)| message.text.as_str())
            .collect()
    }
}

impl ReportSink for RecordingSink {
    fn task_status(&mut self, task: &str, status: RunStatus) {
        self.task_statuses.push((task.to_string(), status));
    }

    fn item_status(&mut self, item: &TestItem, status: RunStatus) {
        self.item_statuses.push((item.id.clone(), status));
    }

    fn output(&mut self, text: &str) {
        self.outputs.push(text.to_string());
    }

    fn failure(&mut self, item: &TestItem, message: FailureMessage) {
        self.failures.push((item.id.clone(), message));
    }

    fn debug_target(&mut self, url: &str) {
        self.debug_targets.push(url.to_string());
    }
}
