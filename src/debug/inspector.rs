// src/debug/inspector.rs

//! Inspector discovery polling.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::{Result, RunwatchError};

/// One attachable target as reported by `GET /json`.
///
/// The endpoint returns more fields than this; only the debugger endpoint
/// URL matters here, and targets without one are not yet connectable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorTarget {
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

/// Poll the inspector discovery endpoint until a target is connectable.
///
/// Issues `GET http://127.0.0.1:<port>/json` every `interval` and returns
/// the first `webSocketDebuggerUrl` found. Connection refused and malformed
/// JSON both mean "not ready yet" (the subprocess may still be binding the
/// port or writing its target list) and are retried. Fails with
/// [`RunwatchError::Timeout`] once `timeout` has elapsed from the first
/// attempt.
pub async fn poll_inspector_ready(
    client: &reqwest::Client,
    port: u16,
    timeout: Duration,
    interval: Duration,
) -> Result<String> {
    let url = format!("http://127.0.0.1:{port}/json");
    let deadline = Instant::now() + timeout;

    loop {
        match client.get(&url).send().await {
            Ok(response) => match response.json::<Vec<InspectorTarget>>().await {
                Ok(targets) => {
                    let connectable = targets
                        .into_iter()
                        .find_map(|t| t.web_socket_debugger_url);
                    if let Some(ws_url) = connectable {
                        info!(port, ws_url = %ws_url, "inspector ready");
                        return Ok(ws_url);
                    }
                    debug!(port, "inspector responded but no connectable target yet");
                }
                Err(e) => {
                    debug!(port, error = %e, "inspector response not parseable yet");
                }
            },
            Err(e) => {
                debug!(port, error = %e, "inspector endpoint not accepting connections yet");
            }
        }

        if Instant::now() >= deadline {
            return Err(RunwatchError::Timeout(timeout));
        }
        tokio::time::sleep(interval).await;
    }
}
