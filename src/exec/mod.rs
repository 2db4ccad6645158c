// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the external test
//! runner, using `tokio::process::Command`, streaming its output and
//! reporting the final [`RunOutcome`] back to the orchestrator.
//!
//! - [`backend`] provides the `RunnerExecutor` trait plus the request and
//!   outcome types the orchestrator uses in production, and which tests can
//!   replace with a scripted fake.
//! - [`process`] is the real implementation: argv spawning (never a shell),
//!   chunked stdout/stderr forwarding with CRLF normalization for the sink,
//!   and single-shot SIGTERM cancellation.

pub mod backend;
pub mod process;

pub use backend::{ExecRequest, OutputSink, RunOutcome, RunnerExecutor};
pub use process::ProcessExecutor;
