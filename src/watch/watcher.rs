// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A change event for the watched result artifact.
#[derive(Debug, Clone)]
pub struct ArtifactEvent {
    pub path: PathBuf,
}

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher for a single result-artifact path.
///
/// The artifact itself may not exist yet (the runner creates it), so the
/// watch is placed on its parent directory (created if absent) and
/// events are filtered down to paths with the artifact's file name.
pub fn spawn_artifact_watcher(
    artifact_path: &Path,
    events: mpsc::Sender<ArtifactEvent>,
) -> Result<WatcherHandle> {
    let dir = artifact_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = artifact_path
        .file_name()
        .context("artifact path has no file name")?
        .to_os_string();

    // The runner only creates the directory when it first writes results;
    // notify needs it to exist up front.
    std::fs::create_dir_all(&dir).with_context(|| format!("creating artifact dir {:?}", dir))?;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // We can't log via tracing here easily, so fallback to stderr.
                        eprintln!("runwatch: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("runwatch: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!(dir = ?dir, file = ?file_name, "artifact watcher started");

    // Async task that narrows directory events down to artifact touches.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            for path in event.paths {
                if path.file_name() != Some(file_name.as_os_str()) {
                    continue;
                }
                debug!(path = ?path, "artifact change observed");
                if events.send(ArtifactEvent { path }).await.is_err() {
                    // Receiver gone; the dispatch finished.
                    return;
                }
            }
        }
        debug!("artifact watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
