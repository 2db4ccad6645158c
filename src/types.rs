// src/types.rs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Status of one dispatch (or of one logical test item within it).
///
/// - `Failed` means the runner completed and reported failing assertions.
/// - `Errored` and `Timeout` mean the runner's outcome could not be
///   determined (no artifact after exit, or the dispatch deadline fired).
///   They are terminal but distinct from `Failed`.
///
/// Transitions are driven exclusively by the run lifecycle in
/// `engine::lifecycle`; collaborators only observe them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Passed,
    Failed,
    Errored,
    Timeout,
    /// No matching result in the artifact for this test item.
    Skipped,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Idle | RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::Errored => "errored",
            RunStatus::Timeout => "timeout",
            RunStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Tunables for a single dispatch.
///
/// Defaults mirror the runner's documented behaviour; only the dispatch
/// deadline is commonly overridden (CLI `--timeout-secs`).
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Overall per-dispatch deadline. Also the safety timeout for debug
    /// sessions and the per-task deadline in batch runs.
    pub dispatch_timeout: Duration,
    /// How long to keep waiting for a result artifact after the runner
    /// exits non-zero (artifacts may be written after process exit).
    pub result_grace: Duration,
    /// Overall bound on inspector discovery polling.
    pub inspector_poll_timeout: Duration,
    /// Delay between inspector discovery attempts.
    pub inspector_poll_interval: Duration,
    /// Grace between the group SIGTERM and the escalating SIGKILL.
    pub force_kill_grace: Duration,
    /// First port probed for a debug session.
    pub debug_port_base: u16,
    /// Where the runner writes its result artifact, relative to the
    /// workspace root.
    pub artifact_path: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(300),
            result_grace: Duration::from_millis(500),
            inspector_poll_timeout: Duration::from_secs(15),
            inspector_poll_interval: Duration::from_millis(200),
            force_kill_grace: Duration::from_millis(2000),
            debug_port_base: 9229,
            artifact_path: PathBuf::from(".testflow/results.json"),
        }
    }
}
