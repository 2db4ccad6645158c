// src/debug/session.rs

//! Process-group termination and debug-session bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Handle for the armed force-kill timer.
///
/// [`kill_process_group`] arms a timer that escalates to SIGKILL after the
/// grace period. The handle must be kept and [`disarm`]ed the moment the
/// process reports close, so a process that exits within the grace window
/// never receives a stray SIGKILL against a reused or dead pid.
///
/// [`disarm`]: ForceKillGuard::disarm
#[derive(Debug)]
pub struct ForceKillGuard {
    timer: Option<tokio::task::JoinHandle<()>>,
}

impl ForceKillGuard {
    /// Cancel the pending force-kill. Call on process close.
    pub fn disarm(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!("force-kill timer disarmed");
        }
    }
}

/// Send a termination signal to the runner's whole process group, with a
/// SIGKILL escalation after `force_kill_grace`.
///
/// The group signal (negative pid) reaches children the runner spawned;
/// when group delivery fails the process alone is signalled as a fallback.
/// Callers must invoke this at most once per child (each invocation sends
/// another SIGTERM and arms another independent timer) and must disarm the
/// returned guard on close.
pub fn kill_process_group(pid: u32, force_kill_grace: Duration) -> ForceKillGuard {
    info!(pid, "terminating runner process group");
    signal_group(pid, TerminationSignal::Term);

    let timer = tokio::spawn(async move {
        tokio::time::sleep(force_kill_grace).await;
        warn!(pid, "runner still alive after grace period; escalating to kill");
        signal_group(pid, TerminationSignal::Kill);
    });

    ForceKillGuard { timer: Some(timer) }
}

enum TerminationSignal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: TerminationSignal) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let signal = match signal {
        TerminationSignal::Term => Signal::SIGTERM,
        TerminationSignal::Kill => Signal::SIGKILL,
    };
    let raw = Pid::from_raw(pid as i32);

    if let Err(e) = killpg(raw, signal) {
        debug!(pid, error = %e, "group signal failed; signalling process alone");
        if let Err(e) = kill(raw, signal) {
            debug!(pid, error = %e, "process signal failed (already gone?)");
        }
    }
}

#[cfg(not(unix))]
fn signal_group(pid: u32, signal: TerminationSignal) {
    // No process groups here; the executor's kill-on-drop is the backstop.
    let _ = signal;
    debug!(pid, "process-group signalling not supported on this platform");
}

/// Registry of debugger-terminated notifications, keyed by session name.
///
/// The orchestrator subscribes before starting a debug session and the host
/// notifies when its debug session ends. A listener left registered after
/// its race resolves would spuriously match a later, unrelated session with
/// the same name; hence [`TerminationListener::dispose`], which the
/// orchestrator calls on every listener that did not win its race.
#[derive(Debug, Clone, Default)]
pub struct DebuggerEvents {
    inner: Arc<Mutex<HashMap<String, oneshot::Sender<()>>>>,
}

impl DebuggerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the end of the named debug session.
    ///
    /// A second subscription for the same name replaces the first.
    pub fn subscribe(&self, session: &str) -> TerminationListener {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        if inner.insert(session.to_string(), tx).is_some() {
            warn!(session, "replacing existing debug-session listener");
        }
        TerminationListener {
            session: session.to_string(),
            rx,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Report that the named debug session has ended.
    pub fn notify_terminated(&self, session: &str) {
        let sender = self.inner.lock().unwrap().remove(session);
        match sender {
            Some(tx) => {
                let _ = tx.send(());
            }
            None => debug!(session, "debug session ended with no listener registered"),
        }
    }
}

/// One race participant: the pending debugger-terminated notification.
#[derive(Debug)]
pub struct TerminationListener {
    session: String,
    rx: oneshot::Receiver<()>,
    registry: Arc<Mutex<HashMap<String, oneshot::Sender<()>>>>,
}

impl TerminationListener {
    /// The future that resolves when the session terminates. Poll via
    /// `&mut` so the listener can still be disposed afterwards.
    pub fn terminated(&mut self) -> &mut oneshot::Receiver<()> {
        &mut self.rx
    }

    /// Deregister. Must be called whenever this participant did not win
    /// the end-of-session race.
    pub fn dispose(self) {
        let mut inner = self.registry.lock().unwrap();
        if inner.remove(&self.session).is_some() {
            debug!(session = %self.session, "disposed debug-session listener");
        }
    }
}
