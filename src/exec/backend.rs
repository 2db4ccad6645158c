// src/exec/backend.rs

//! Pluggable runner-executor abstraction.
//!
//! The orchestrator talks to a `RunnerExecutor` instead of spawning
//! processes directly. This makes it easy to swap in a fake executor in
//! tests while keeping the production implementation in [`process`].
//!
//! - `ProcessExecutor` is the default implementation used by `runwatch`.
//! - Tests provide their own `RunnerExecutor` that, for example, records
//!   which invocations were requested and writes a canned result artifact.
//!
//! [`process`]: super::process

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::errors::Result;

/// Where streamed runner output goes while the process is alive.
///
/// The host's output channel expects CRLF line endings, so chunks arrive
/// here already normalized; the raw text is captured separately for the
/// final [`RunOutcome`].
pub trait OutputSink: Send + Sync {
    fn append(&self, chunk: &str);
}

/// One runner invocation.
pub struct ExecRequest {
    /// Program to spawn.
    pub command: String,
    /// Discrete argument vector; never joined into a shell string.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub cwd: PathBuf,
    /// Fires at most once to request termination (SIGTERM). The executor
    /// never escalates to SIGKILL; that is the caller's call.
    pub cancel: Option<oneshot::Receiver<()>>,
    /// Resolved with the child's pid once it is actually up. The run only
    /// counts as `Running` from this point; a spawn failure means it never
    /// fires.
    pub spawned: Option<oneshot::Sender<u32>>,
    /// Optional sink for live output.
    pub sink: Option<Arc<dyn OutputSink>>,
}

impl std::fmt::Debug for ExecRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecRequest")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

/// What the runner process left behind.
///
/// Immutable once produced; `stdout`/`stderr` hold the unmodified captured
/// text (no CRLF normalization).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Trait abstracting how runner invocations are executed.
///
/// The returned future resolves when the process closes (or fails to
/// spawn); it is the single terminating event all cleanup keys off.
pub trait RunnerExecutor: Send + Sync {
    fn execute(
        &self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutcome>> + Send + '_>>;
}
