// src/lib.rs

pub mod cli;
pub mod config;
pub mod correlate;
pub mod debug;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod report;
pub mod store;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_task_source_or_empty;
use crate::config::{TaskDefinition, TaskSource};
use crate::correlate::MtimeCorrelator;
use crate::engine::{DispatchRequest, Orchestrator};
use crate::errors::RunwatchError;
use crate::exec::ProcessExecutor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::report::{FailureMessage, ReportSink, TestIdMatcher, TestItem};
use crate::store::FileRecordStore;
use crate::types::{RunSettings, RunStatus};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task source loading
/// - orchestrator (executor, watcher, correlator, applier, store)
/// - the console sink
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let config_path = Path::new(&args.config);
    let source = load_task_source_or_empty(fs.as_ref(), config_path);

    if args.dry_run {
        print_dry_run(&source);
        return Ok(());
    }

    let mut settings = RunSettings::default();
    if let Some(secs) = args.timeout_secs {
        settings.dispatch_timeout = Duration::from_secs(secs);
    }

    let workspace_root = std::env::current_dir()?;
    let store = FileRecordStore::new(workspace_root.join(".runwatch/last-runs.json"), fs.clone());

    let orchestrator = Orchestrator::new(
        Arc::new(ProcessExecutor::new()),
        fs.clone(),
        Arc::new(MtimeCorrelator::new(fs.clone())),
        Arc::new(store),
        settings,
        workspace_root,
    );

    let mut sink = ConsoleSink::default();
    let matcher = TestIdMatcher;
    // The CLI has no test discovery; verdicts are task-level, driven by the
    // artifact summary.
    let items: Vec<TestItem> = Vec::new();

    let statuses: Vec<(String, RunStatus)> = if args.all {
        let tasks: Vec<TaskDefinition> = source.tasks.values().cloned().collect();
        orchestrator
            .run_all(&tasks, &items, &matcher, &mut sink)
            .await?
    } else if let Some(name) = &args.task {
        let task = source
            .get(name)
            .ok_or_else(|| RunwatchError::TaskNotFound(name.clone()))?;
        let request = DispatchRequest {
            task,
            items: &items,
            matcher: &matcher,
            debug: args.debug,
        };
        let status = orchestrator.dispatch(request, &mut sink).await?;
        vec![(task.name.clone(), status)]
    } else {
        anyhow::bail!("nothing to do: pass --task NAME or --all");
    };

    let not_passed = statuses
        .iter()
        .filter(|(_, status)| *status != RunStatus::Passed)
        .count();
    if not_passed > 0 {
        anyhow::bail!("{not_passed} task(s) did not pass");
    }

    Ok(())
}

/// Simple dry-run output: print the surfaced tasks and their argv.
fn print_dry_run(source: &TaskSource) {
    println!("runwatch dry-run");
    println!("tasks ({}):", source.tasks.len());
    for (name, task) in source.tasks.iter() {
        println!("  - {name}");
        println!("      program: {}", task.program);
        if !task.args.is_empty() {
            println!("      args: {:?}", task.args);
        }
    }

    debug!("dry-run complete (no execution)");
}

/// Report sink that prints to stdout.
///
/// Streamed runner output arrives CRLF-normalized; printing re-splits it
/// into lines, so the terminal sees neither bare `\r` nor doubled blank
/// lines.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn task_status(&mut self, task: &str, status: RunStatus) {
        println!("[{status}] {task}");
    }

    fn item_status(&mut self, item: &TestItem, status: RunStatus) {
        println!("  [{status}] {}", item.label);
    }

    fn output(&mut self, text: &str) {
        for line in text.lines() {
            println!("  {}", line.trim_end_matches('\r'));
        }
    }

    fn failure(&mut self, item: &TestItem, message: FailureMessage) {
        println!("  FAIL {}: {}", item.label, message.text);
        if let (Some(expected), Some(actual)) = (&message.expected, &message.actual) {
            println!("       expected: {expected}");
            println!("       actual:   {actual}");
        }
        if let Some(location) = &message.location {
            println!("       at {}:{}", location.file, location.line);
        }
    }

    fn debug_target(&mut self, url: &str) {
        println!("debugger listening at {url}");
    }
}
