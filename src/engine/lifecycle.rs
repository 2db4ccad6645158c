// src/engine/lifecycle.rs

//! Pure per-dispatch lifecycle state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`LifecycleEvent`]s and produces:
//! - an updated run status
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::orchestrator`) is responsible for:
//! - spawning the runner and watching the artifact
//! - arming the grace and deadline timers
//! - applying parsed results to the sink
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use tracing::{debug, warn};

use crate::types::RunStatus;

use super::{LifecycleCommand, LifecycleEvent, LifecycleStep};

/// Status plus the two facts that shape the endgame: the exit code (if the
/// process closed) and whether an artifact was already attributed.
#[derive(Debug, Clone)]
pub struct RunLifecycle {
    status: RunStatus,
    exit_code: Option<i32>,
    artifact_attributed: bool,
}

impl Default for RunLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLifecycle {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Idle,
            exit_code: None,
            artifact_attributed: false,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Handle a single event, updating state and returning the resulting
    /// commands for the IO shell.
    pub fn on_event(&mut self, event: LifecycleEvent) -> LifecycleStep {
        if self.status.is_terminal() {
            // Late timers and listeners may still fire after the run
            // resolved; they must not disturb the terminal state.
            debug!(?event, status = %self.status, "event after terminal state; ignoring");
            return LifecycleStep::default();
        }

        let mut commands = Vec::new();

        match event {
            LifecycleEvent::DispatchRequested => {
                if self.status == RunStatus::Idle {
                    self.status = RunStatus::Running;
                } else {
                    // A task that is already Running must not be
                    // re-dispatched concurrently.
                    warn!(status = %self.status, "dispatch requested while already running; ignoring");
                }
            }

            LifecycleEvent::ProcessExited { exit_code } => {
                self.exit_code = Some(exit_code);
                // Artifacts may be written after process exit; a non-zero
                // exit without one gets the grace window before the run is
                // declared errored. A user cancel surfaces as a non-zero
                // exit and takes the same path.
                if exit_code != 0 && !self.artifact_attributed {
                    commands.push(LifecycleCommand::ArmGraceTimer);
                }
            }

            LifecycleEvent::ArtifactAttributed => {
                self.artifact_attributed = true;
                commands.push(LifecycleCommand::ApplyResults);
            }

            LifecycleEvent::ResultsApplied { failed } => {
                let status = if failed == 0 {
                    RunStatus::Passed
                } else {
                    RunStatus::Failed
                };
                self.status = status;
                commands.push(LifecycleCommand::Finish(status));
            }

            LifecycleEvent::GraceElapsed => {
                if !self.artifact_attributed {
                    self.status = RunStatus::Errored;
                    commands.push(LifecycleCommand::Finish(RunStatus::Errored));
                }
            }

            LifecycleEvent::DeadlineElapsed => {
                self.status = RunStatus::Timeout;
                commands.push(LifecycleCommand::Finish(RunStatus::Timeout));
            }
        }

        LifecycleStep { commands }
    }
}
