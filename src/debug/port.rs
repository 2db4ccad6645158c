// src/debug/port.rs

//! Free-port allocation for debug sessions.

use tokio::net::TcpListener;
use tracing::debug;

use crate::errors::{Result, RunwatchError};

/// How many consecutive ports are probed before giving up.
pub const PORT_PROBE_ATTEMPTS: u16 = 20;

/// Find a free TCP port starting at `base`.
///
/// Tries `base`, `base + 1`, … for up to [`PORT_PROBE_ATTEMPTS`] attempts.
/// The first port that binds is released immediately and returned; the
/// caller hands it to the runner, which re-binds it for its inspector.
/// Fails with [`RunwatchError::ResourceExhausted`] when every probe fails.
pub async fn find_free_port(base: u16) -> Result<u16> {
    let mut last = base;

    for offset in 0..PORT_PROBE_ATTEMPTS {
        let Some(port) = base.checked_add(offset) else {
            break;
        };
        last = port;

        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => {
                // Release the port straight away; we only needed to prove
                // it binds.
                drop(listener);
                debug!(port, attempts = offset + 1, "allocated free debug port");
                return Ok(port);
            }
            Err(e) => {
                debug!(port, error = %e, "debug port in use; trying next");
            }
        }
    }

    Err(RunwatchError::ResourceExhausted {
        base,
        last,
        attempts: PORT_PROBE_ATTEMPTS as u32,
    })
}
