// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `runwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runwatch",
    version,
    about = "Run testflow tasks, stream their output and reconcile their result artifacts.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task source file (JSON, comments and trailing commas
    /// tolerated).
    #[arg(long, value_name = "PATH", default_value = "testflow-tasks.json")]
    pub config: String,

    /// Run a single named task.
    #[arg(long, value_name = "NAME", conflicts_with = "all")]
    pub task: Option<String>,

    /// Run every surfaced task, strictly one at a time.
    #[arg(long)]
    pub all: bool,

    /// Launch the runner with a debug inspector attached.
    #[arg(long)]
    pub debug: bool,

    /// Per-task deadline in seconds (default 300).
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate the task source and print the surfaced tasks, but
    /// don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
