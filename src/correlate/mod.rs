// src/correlate/mod.rs

//! Result attribution.
//!
//! The runner writes its result artifact asynchronously; nothing in the
//! artifact says which invocation produced it. Attribution is therefore a
//! heuristic: a change event is accepted only when the artifact's mtime is
//! at or after the dispatch send time, which filters out stale and external
//! writes. A write from a *different* invocation landing after the send
//! time would still be accepted; the documented mitigation is that batch
//! execution dispatches strictly one task at a time.
//!
//! The trait exists so that, should the runner ever embed an invocation id
//! in the artifact itself, the swap stays local to this module.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::fs::FileSystem;

/// Decides whether an artifact change event belongs to the invocation that
/// was dispatched at `send_time`.
pub trait ResultCorrelator: Send + Sync {
    fn attribute(&self, send_time: SystemTime, artifact_path: &Path) -> bool;
}

/// Production correlator: artifact mtime vs. dispatch send time.
#[derive(Debug, Clone)]
pub struct MtimeCorrelator {
    fs: Arc<dyn FileSystem>,
}

impl MtimeCorrelator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl ResultCorrelator for MtimeCorrelator {
    fn attribute(&self, send_time: SystemTime, artifact_path: &Path) -> bool {
        let mtime = match self.fs.modified(artifact_path) {
            Ok(mtime) => mtime,
            Err(e) => {
                // Absent or unreadable: cannot be ours (yet).
                debug!(path = ?artifact_path, error = %e, "artifact not readable; rejecting event");
                return false;
            }
        };

        if mtime < send_time {
            // Stale or external write; silently filtered.
            trace!(path = ?artifact_path, ?mtime, ?send_time, "stale artifact ignored");
            false
        } else {
            true
        }
    }
}
