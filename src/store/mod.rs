// src/store/mod.rs

//! Last-run persistence.
//!
//! After each completed run the orchestrator records what happened under a
//! `<namespace>.<workspace_root>.<task_name>` key. The store is a simple
//! last-write-wins keyed map; concurrent writers for the same key are not
//! expected and not guarded against. Records survive restarts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fs::FileSystem;

pub const STORE_NAMESPACE: &str = "runwatch";

/// Outcome of the most recent completed run for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRunRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub duration_ms: u64,
    #[serde(default)]
    pub task_name: Option<String>,
}

impl LastRunRecord {
    pub fn now(passed: u64, failed: u64, skipped: u64, duration_ms: u64, task_name: &str) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            timestamp_ms,
            passed,
            failed,
            skipped,
            duration_ms,
            task_name: Some(task_name.to_string()),
        }
    }
}

/// Storage key for a (workspace, task) pair.
pub fn record_key(workspace_root: &Path, task_name: &str) -> String {
    format!(
        "{}.{}.{}",
        STORE_NAMESPACE,
        workspace_root.display(),
        task_name
    )
}

/// Keyed persistence collaborator. Read and write are the only operations
/// required.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &str) -> Option<LastRunRecord>;
    fn put(&self, key: &str, record: &LastRunRecord) -> Result<()>;
}

/// JSON-file-backed store.
///
/// The whole map is read and rewritten per put; fine for the handful of
/// tasks a workspace carries.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    fn load_map(&self) -> BTreeMap<String, LastRunRecord> {
        let Ok(contents) = self.fs.read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                debug!(path = ?self.path, error = %e, "record store unreadable; starting fresh");
                BTreeMap::new()
            }
        }
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, key: &str) -> Option<LastRunRecord> {
        self.load_map().get(key).cloned()
    }

    fn put(&self, key: &str, record: &LastRunRecord) -> Result<()> {
        let mut map = self.load_map();
        map.insert(key.to_string(), record.clone());
        let serialized = serde_json::to_string_pretty(&map)?;
        self.fs.write(&self.path, serialized.as_bytes())?;
        debug!(key, "last-run record persisted");
        Ok(())
    }
}
