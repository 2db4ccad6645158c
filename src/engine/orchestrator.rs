// src/engine/orchestrator.rs

//! Async IO shell around the run lifecycle.
//!
//! One [`Orchestrator::dispatch`] call owns a complete invocation: it
//! records the send time, starts the artifact watcher, spawns the runner,
//! and then drives [`RunLifecycle`] from whatever resolves first: process
//! close, an attributed artifact event, the no-result grace window, the
//! dispatch deadline, or (for debug runs) the debugger-terminated
//! notification. Batch execution serializes dispatches strictly one at a
//! time, which is what keeps the mtime attribution heuristic honest.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::TaskDefinition;
use crate::correlate::ResultCorrelator;
use crate::debug::session::{kill_process_group, DebuggerEvents, ForceKillGuard, TerminationListener};
use crate::debug::{find_free_port, poll_inspector_ready};
use crate::errors::Result;
use crate::exec::{ExecRequest, OutputSink, RunnerExecutor};
use crate::fs::FileSystem;
use crate::report::model::RunSummary;
use crate::report::{apply_results, parse_artifact, ReportSink, ResultMatcher, TestItem};
use crate::store::{record_key, LastRunRecord, RecordStore};
use crate::types::{RunSettings, RunStatus};
use crate::watch::spawn_artifact_watcher;

use super::lifecycle::RunLifecycle;
use super::{LifecycleCommand, LifecycleEvent};

/// Everything one dispatch needs besides the orchestrator's own wiring.
pub struct DispatchRequest<'a> {
    pub task: &'a TaskDefinition,
    pub items: &'a [TestItem],
    pub matcher: &'a dyn ResultMatcher,
    pub debug: bool,
}

/// Composes executor, watcher, correlator, applier and store per dispatch.
pub struct Orchestrator<E: RunnerExecutor> {
    executor: Arc<E>,
    fs: Arc<dyn FileSystem>,
    correlator: Arc<dyn ResultCorrelator>,
    store: Arc<dyn RecordStore>,
    debugger_events: DebuggerEvents,
    client: reqwest::Client,
    settings: RunSettings,
    workspace_root: PathBuf,
}

impl<E: RunnerExecutor> std::fmt::Debug for Orchestrator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("workspace_root", &self.workspace_root)
            .finish_non_exhaustive()
    }
}

/// Bridges executor output chunks into the dispatch loop.
struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl OutputSink for ChannelSink {
    fn append(&self, chunk: &str) {
        let _ = self.tx.send(chunk.to_string());
    }
}

impl<E: RunnerExecutor> Orchestrator<E> {
    pub fn new(
        executor: Arc<E>,
        fs: Arc<dyn FileSystem>,
        correlator: Arc<dyn ResultCorrelator>,
        store: Arc<dyn RecordStore>,
        settings: RunSettings,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            fs,
            correlator,
            store,
            debugger_events: DebuggerEvents::new(),
            client: reqwest::Client::new(),
            settings,
            workspace_root: workspace_root.into(),
        }
    }

    /// Shared registry the host uses to report debugger-session ends.
    pub fn debugger_events(&self) -> DebuggerEvents {
        self.debugger_events.clone()
    }

    /// Run every task strictly one at a time.
    ///
    /// Each task's dispatch is awaited to its terminal state (artifact
    /// applied, errored, or the per-task deadline) before the next is
    /// started, so a later task's artifact write can never be attributed
    /// to an earlier one.
    pub async fn run_all(
        &self,
        tasks: &[TaskDefinition],
        items: &[TestItem],
        matcher: &dyn ResultMatcher,
        sink: &mut dyn ReportSink,
    ) -> Result<Vec<(String, RunStatus)>> {
        let mut results = Vec::with_capacity(tasks.len());

        for task in tasks {
            info!(task = %task.name, "batch: dispatching");
            let request = DispatchRequest {
                task,
                items,
                matcher,
                debug: false,
            };
            let status = match self.dispatch(request, sink).await {
                Ok(status) => status,
                Err(e) => {
                    // A spawn failure for one task must not abort the batch.
                    warn!(task = %task.name, error = %e, "batch: dispatch failed");
                    sink.task_status(&task.name, RunStatus::Errored);
                    RunStatus::Errored
                }
            };
            results.push((task.name.clone(), status));
        }

        Ok(results)
    }

    /// Run one task to a terminal status.
    pub async fn dispatch(
        &self,
        request: DispatchRequest<'_>,
        sink: &mut dyn ReportSink,
    ) -> Result<RunStatus> {
        let task = request.task;
        let mut lifecycle = RunLifecycle::new();

        let artifact_path = self.workspace_root.join(&self.settings.artifact_path);

        // The send time is recorded before anything is dispatched; the
        // correlator compares artifact mtimes against it.
        let send_time = SystemTime::now();

        let (artifact_tx, mut artifact_rx) = mpsc::channel(16);
        let _watcher = spawn_artifact_watcher(&artifact_path, artifact_tx)?;

        // Debug runs claim their port before the runner is told about it.
        let mut args = task.args.clone();
        let mut debug_port = None;
        let mut term_listener: Option<TerminationListener> = None;
        if request.debug {
            let port = find_free_port(self.settings.debug_port_base).await?;
            args.push("--inspect-port".to_string());
            args.push(port.to_string());
            debug_port = Some(port);
            term_listener = Some(self.debugger_events.subscribe(&task.name));
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (spawned_tx, spawned_rx) = oneshot::channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let mut exec_fut = self.executor.execute(ExecRequest {
            command: task.program.clone(),
            args,
            cwd: self.workspace_root.clone(),
            cancel: Some(cancel_rx),
            spawned: Some(spawned_tx),
            sink: Some(Arc::new(ChannelSink { tx: out_tx })),
        });

        let deadline = tokio::time::sleep(self.settings.dispatch_timeout);
        tokio::pin!(deadline);

        let mut spawned_rx = Some(spawned_rx);
        let mut grace: Option<Pin<Box<tokio::time::Sleep>>> = None;
        let mut inspector: Option<Pin<Box<dyn Future<Output = Result<String>> + Send>>> = None;
        let mut force_kill: Option<ForceKillGuard> = None;

        let mut exec_done = false;
        let mut artifact_open = true;
        let mut pid: Option<u32> = None;
        let mut summary: Option<RunSummary> = None;

        let final_status = loop {
            let mut finish = None;

            tokio::select! {
                // Runner process is up.
                res = async { spawned_rx.as_mut().unwrap().await }, if spawned_rx.is_some() => {
                    spawned_rx = None;
                    match res {
                        Ok(child_pid) => {
                            pid = Some(child_pid);
                            let step = lifecycle.on_event(LifecycleEvent::DispatchRequested);
                            debug_assert!(step.commands.is_empty());
                            sink.task_status(&task.name, RunStatus::Running);

                            if let Some(port) = debug_port {
                                let client = self.client.clone();
                                let timeout = self.settings.inspector_poll_timeout;
                                let interval = self.settings.inspector_poll_interval;
                                inspector = Some(Box::pin(async move {
                                    poll_inspector_ready(&client, port, timeout, interval).await
                                }));
                            }
                        }
                        Err(_) => {
                            // Spawn failed; the executor future delivers the
                            // actual error below.
                            debug!(task = %task.name, "runner never reported spawning");
                        }
                    }
                }

                // Runner process closed: the single terminating event.
                res = &mut exec_fut, if !exec_done => {
                    exec_done = true;
                    if let Some(guard) = force_kill.take() {
                        guard.disarm();
                    }
                    // The end-of-session race is resolved; dispose the
                    // listener so it cannot match a later session.
                    if let Some(listener) = term_listener.take() {
                        listener.dispose();
                    }

                    match res {
                        Ok(outcome) => {
                            let step = lifecycle.on_event(LifecycleEvent::ProcessExited {
                                exit_code: outcome.exit_code,
                            });
                            for command in step.commands {
                                match command {
                                    LifecycleCommand::ArmGraceTimer => {
                                        grace = Some(Box::pin(tokio::time::sleep(
                                            self.settings.result_grace,
                                        )));
                                    }
                                    LifecycleCommand::Finish(status) => finish = Some(status),
                                    LifecycleCommand::ApplyResults => {}
                                }
                            }
                        }
                        Err(e) => {
                            // Spawn-level failure: surfaced immediately; the
                            // run never reached Running.
                            return Err(e);
                        }
                    }
                }

                // Live runner output.
                Some(chunk) = out_rx.recv() => {
                    sink.output(&chunk);
                }

                // The artifact was touched.
                maybe_event = artifact_rx.recv(), if artifact_open => {
                    match maybe_event {
                        None => artifact_open = false,
                        Some(event) => {
                            if !self.correlator.attribute(send_time, &event.path) {
                                // Stale or external write; silently filtered.
                            } else if let Ok(text) = self.fs.read_to_string(&event.path) {
                                match parse_artifact(&text) {
                                    Ok(artifact) => {
                                        grace = None;
                                        let step = lifecycle
                                            .on_event(LifecycleEvent::ArtifactAttributed);
                                        if step.commands.contains(&LifecycleCommand::ApplyResults) {
                                            apply_results(
                                                request.items,
                                                &artifact,
                                                request.matcher,
                                                sink,
                                            );
                                            summary = Some(artifact.summary);
                                            let step = lifecycle.on_event(
                                                LifecycleEvent::ResultsApplied {
                                                    failed: artifact.summary.failed,
                                                },
                                            );
                                            for command in step.commands {
                                                if let LifecycleCommand::Finish(status) = command {
                                                    finish = Some(status);
                                                }
                                            }
                                        }
                                    }
                                    Err(e) => {
                                        // Possibly observed mid-write; the
                                        // next change event retries.
                                        debug!(error = %e, "artifact not parseable yet");
                                    }
                                }
                            }
                        }
                    }
                }

                // No artifact arrived after a non-zero exit.
                _ = async { grace.as_mut().unwrap().as_mut().await }, if grace.is_some() => {
                    grace = None;
                    let step = lifecycle.on_event(LifecycleEvent::GraceElapsed);
                    for command in step.commands {
                        if let LifecycleCommand::Finish(status) = command {
                            finish = Some(status);
                        }
                    }
                }

                // Overall dispatch deadline (doubles as the debug-session
                // safety timeout).
                _ = &mut deadline => {
                    let step = lifecycle.on_event(LifecycleEvent::DeadlineElapsed);
                    for command in step.commands {
                        if let LifecycleCommand::Finish(status) = command {
                            finish = Some(status);
                        }
                    }
                }

                // Inspector discovery resolved.
                res = async { inspector.as_mut().unwrap().as_mut().await }, if inspector.is_some() => {
                    inspector = None;
                    match res {
                        Ok(url) => sink.debug_target(&url),
                        Err(e) => {
                            warn!(task = %task.name, error = %e, "inspector never became ready");
                        }
                    }
                }

                // The host reported the debugger session ended.
                res = async { term_listener.as_mut().unwrap().terminated().await }, if term_listener.is_some() => {
                    term_listener = None;
                    if res.is_ok() {
                        info!(task = %task.name, "debugger session terminated; stopping runner");
                        if let (Some(pid), false) = (pid, exec_done) {
                            if force_kill.is_none() {
                                force_kill = Some(kill_process_group(
                                    pid,
                                    self.settings.force_kill_grace,
                                ));
                            }
                        }
                    } else {
                        debug!(task = %task.name, "debug-session listener superseded");
                    }
                }
            }

            if let Some(status) = finish {
                break status;
            }
        };

        // Teardown of a runner that outlived its run: request termination,
        // wait out the grace, then let kill-on-drop reap it. Only the
        // debug safety-timeout path escalates straight to a group kill;
        // the runner may have spawned children the single SIGTERM would
        // miss.
        if !exec_done {
            if request.debug && final_status == RunStatus::Timeout && force_kill.is_none() {
                if let Some(pid) = pid {
                    force_kill = Some(kill_process_group(pid, self.settings.force_kill_grace));
                } else {
                    let _ = cancel_tx.send(());
                }
            } else {
                let _ = cancel_tx.send(());
            }

            let teardown = self.settings.force_kill_grace + Duration::from_millis(250);
            match tokio::time::timeout(teardown, &mut exec_fut).await {
                Ok(_) => {
                    if let Some(guard) = force_kill.take() {
                        guard.disarm();
                    }
                }
                Err(_) => {
                    warn!(task = %task.name, "runner did not exit during teardown; dropping handle");
                }
            }
        }

        if let Some(listener) = term_listener.take() {
            listener.dispose();
        }

        match final_status {
            RunStatus::Errored => {
                let exit_code = lifecycle.exit_code().unwrap_or(-1);
                sink.output(&format!(
                    "{}: no result artifact produced (exit code {exit_code})",
                    task.name
                ));
            }
            RunStatus::Timeout => {
                sink.output(&format!(
                    "{}: timed out after {:?}",
                    task.name, self.settings.dispatch_timeout
                ));
            }
            _ => {}
        }

        if let Some(summary) = summary {
            let record = LastRunRecord::now(
                summary.passed,
                summary.failed,
                summary.skipped,
                summary.duration_ms,
                &task.name,
            );
            let key = record_key(&self.workspace_root, &task.name);
            if let Err(e) = self.store.put(&key, &record) {
                warn!(task = %task.name, error = %e, "failed to persist last-run record");
            }
        }

        sink.task_status(&task.name, final_status);
        info!(task = %task.name, status = %final_status, "dispatch finished");

        Ok(final_status)
    }
}
