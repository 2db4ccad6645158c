use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use runwatch::errors::Result;
use runwatch::exec::{ExecRequest, RunOutcome, RunnerExecutor};

/// One scripted invocation outcome for [`FakeRunner`].
#[derive(Debug, Clone, Default)]
pub struct FakeInvocation {
    pub exit_code: i32,
    /// How long the fake process "runs" before exiting.
    pub exit_delay: Duration,
    /// Optionally write an artifact file (path, contents) after a delay,
    /// before exiting, mimicking the real runner's write-then-exit order.
    pub artifact: Option<(PathBuf, String, Duration)>,
    /// Text streamed to the output sink.
    pub stdout: String,
}

impl FakeInvocation {
    pub fn exiting(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn writing_artifact(path: impl Into<PathBuf>, contents: &str, delay: Duration) -> Self {
        Self {
            artifact: Some((path.into(), contents.to_string(), delay)),
            ..Self::default()
        }
    }
}

/// A fake executor that:
/// - records which invocations were requested (program + argv)
/// - plays back scripted [`FakeInvocation`]s in order, optionally writing
///   a result artifact like the real runner would.
#[derive(Debug, Default)]
pub struct FakeRunner {
    script: Mutex<VecDeque<FakeInvocation>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, invocation: FakeInvocation) {
        self.script.lock().unwrap().push_back(invocation);
    }

    /// Shared record of requested invocations, in dispatch order.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

impl RunnerExecutor for FakeRunner {
    fn execute(
        &self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutcome>> + Send + '_>> {
        let invocation = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            {
                let mut guard = executed.lock().unwrap();
                guard.push(format!("{} {}", request.command, request.args.join(" ")));
            }

            if let Some(spawned) = request.spawned {
                let _ = spawned.send(4242);
            }

            if let Some(sink) = request.sink.as_deref() {
                if !invocation.stdout.is_empty() {
                    sink.append(&invocation.stdout);
                }
            }

            // The artifact write runs independently of process lifetime, so
            // scripts can land it before *or after* the exit, just like the
            // real runner.
            if let Some((path, contents, delay)) = invocation.artifact {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(parent) = path.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    if let Err(e) = std::fs::write(&path, contents) {
                        eprintln!("fake runner: failed to write artifact: {e}");
                    }
                });
            }

            // Honour cancellation like a well-behaved process: exit early
            // with a non-zero code.
            if let Some(mut cancel) = request.cancel {
                tokio::select! {
                    _ = tokio::time::sleep(invocation.exit_delay) => {}
                    res = &mut cancel => {
                        if res.is_ok() {
                            return Ok(RunOutcome {
                                exit_code: -1,
                                stdout: invocation.stdout,
                                stderr: String::new(),
                            });
                        }
                        tokio::time::sleep(invocation.exit_delay).await;
                    }
                }
            } else {
                tokio::time::sleep(invocation.exit_delay).await;
            }

            Ok(RunOutcome {
                exit_code: invocation.exit_code,
                stdout: invocation.stdout,
                stderr: String::new(),
            })
        })
    }
}
