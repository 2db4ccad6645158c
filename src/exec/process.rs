// src/exec/process.rs

//! Real process executor.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::{Result, RunwatchError};

use super::backend::{ExecRequest, OutputSink, RunOutcome, RunnerExecutor};

/// Spawns the runner as a direct child process.
///
/// Arguments are passed as a discrete vector, so special characters in
/// paths or arguments never reach a shell. On Unix the child is placed in
/// its own process group (`setpgid`) so a later group kill reaches any
/// grandchildren the runner spawns.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl RunnerExecutor for ProcessExecutor {
    fn execute(
        &self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutcome>> + Send + '_>> {
        Box::pin(run_process(request))
    }
}

async fn run_process(request: ExecRequest) -> Result<RunOutcome> {
    let ExecRequest {
        command,
        args,
        cwd,
        cancel,
        spawned,
        sink,
    } = request;

    info!(command = %command, ?args, cwd = %cwd.display(), "spawning runner process");

    #[allow(unused_mut)]
    let mut cmd = Command::new(&command);
    cmd.args(&args)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Place the child in its own process group on Unix so killpg can reach
    // everything it spawns.
    #[cfg(unix)]
    {
        #[allow(unused_imports)]
        use std::os::unix::process::CommandExt;
        unsafe {
            cmd.pre_exec(|| {
                libc::setpgid(0, 0);
                Ok(())
            });
        }
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            // Spawn-level failure: dispose the cancellation listener before
            // rejecting so nothing can fire against a process that never
            // existed.
            drop(cancel);
            return Err(RunwatchError::Spawn { command, source });
        }
    };

    let pid = child.id();
    if let Some(spawned) = spawned {
        // The receiver may have gone away (e.g. a non-debug dispatch that
        // does not care about the pid); that is fine.
        let _ = spawned.send(pid.unwrap_or(0));
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_task = tokio::spawn(pump_stream(stdout, sink.clone()));
    let stderr_task = tokio::spawn(pump_stream(stderr, sink));

    // Either the process exits on its own (normal case), or the cancel
    // signal fires first. Cancellation requests termination exactly once
    // and then keeps waiting: the close event is still the single point
    // all cleanup keys off.
    let mut cancel = cancel;
    let status = loop {
        match cancel.take() {
            Some(mut rx) => {
                tokio::select! {
                    status = child.wait() => {
                        break status.map_err(RunwatchError::IoError)?;
                    }
                    res = &mut rx => {
                        match res {
                            Ok(()) => {
                                info!(command = %command, ?pid, "cancellation requested; sending termination signal");
                                request_termination(&mut child, pid);
                            }
                            Err(_) => {
                                debug!(command = %command, "cancel channel closed without explicit cancellation");
                            }
                        }
                        // The listener stays disarmed either way; the next
                        // loop turn just waits for close.
                    }
                }
            }
            None => break child.wait().await.map_err(RunwatchError::IoError)?,
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    let exit_code = status.code().unwrap_or(-1);
    info!(
        command = %command,
        exit_code,
        success = status.success(),
        "runner process exited"
    );

    Ok(RunOutcome {
        exit_code,
        stdout,
        stderr,
    })
}

/// Send SIGTERM to the child, without escalation.
fn request_termination(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = pid {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!(pid, error = %e, "failed to deliver SIGTERM to runner");
            }
            return;
        }
        let _ = child.start_kill();
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        // No SIGTERM equivalent; the closest available is a hard kill.
        if let Err(e) = child.start_kill() {
            warn!(error = %e, "failed to terminate runner");
        }
    }
}

/// Drain one output stream, capturing the raw text and forwarding
/// CRLF-normalized chunks to the sink in arrival order.
async fn pump_stream<R>(reader: Option<R>, sink: Option<Arc<dyn OutputSink>>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return String::new();
    };

    let mut captured = String::new();
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                if let Some(sink) = sink.as_deref() {
                    sink.append(&normalize_crlf(&chunk));
                }
                captured.push_str(&chunk);
            }
            Err(e) => {
                debug!(error = %e, "output stream read failed; stopping capture");
                break;
            }
        }
    }

    captured
}

/// Normalize bare `\n` to `\r\n`, leaving existing `\r\n` sequences alone.
pub fn normalize_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cr = false;

    for c in text.chars() {
        if c == '\n' && !prev_cr {
            out.push('\r');
        }
        out.push(c);
        prev_cr = c == '\r';
    }

    out
}
