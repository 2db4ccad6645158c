// src/errors.rs

//! Crate-wide error taxonomy and helpers.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunwatchError {
    /// The runner binary could not be spawned at all (missing, not
    /// executable). A run that fails this way never reaches `Running`.
    #[error("failed to spawn runner '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The runner exited but no result artifact arrived within the grace
    /// window.
    #[error("no result artifact produced: {0}")]
    NoResultProduced(String),

    /// A bounded wait (inspector poll, dispatch deadline) elapsed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The task source could not be parsed. The affected source contributes
    /// zero tasks; the failure is surfaced as a warning, not a crash.
    #[error("malformed task source: {0}")]
    MalformedConfig(String),

    /// Port allocation for a debug session exhausted its probe range.
    #[error("no free debug port in {base}..={last} after {attempts} attempts")]
    ResourceExhausted { base: u16, last: u16, attempts: u32 },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunwatchError>;
