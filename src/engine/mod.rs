// src/engine/mod.rs

//! Run orchestration engine.
//!
//! This module ties together:
//! - the per-dispatch lifecycle state machine (what a process exit, an
//!   artifact event or an elapsed timer means for the run's status)
//! - the main dispatch loop that reacts to:
//!   - runner spawn / close
//!   - artifact change events
//!   - the no-result grace window and the dispatch deadline
//!   - debug-session signals (inspector readiness, debugger termination)
//!
//! The pure core state machine lives in [`lifecycle`]; the async/IO shell
//! is implemented in [`orchestrator`].

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

use crate::types::RunStatus;

/// Events flowing into the run lifecycle from the IO shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The runner process is up; the run is now `Running`.
    DispatchRequested,
    /// The runner process closed with a concrete exit code.
    ProcessExited { exit_code: i32 },
    /// An artifact change event was attributed to this invocation.
    ArtifactAttributed,
    /// The artifact was parsed and applied; `failed` comes from its summary.
    ResultsApplied { failed: u64 },
    /// The post-exit no-result grace window elapsed.
    GraceElapsed,
    /// The overall dispatch deadline elapsed.
    DeadlineElapsed,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Start the no-result grace timer.
    ArmGraceTimer,
    /// Parse the artifact and apply its results.
    ApplyResults,
    /// The run reached a terminal status; stop the dispatch loop.
    Finish(RunStatus),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, Default)]
pub struct LifecycleStep {
    pub commands: Vec<LifecycleCommand>,
}

pub mod lifecycle;
pub mod orchestrator;

pub use lifecycle::RunLifecycle;
pub use orchestrator::{DispatchRequest, Orchestrator};
