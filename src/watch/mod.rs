// src/watch/mod.rs

//! Result-artifact watching.
//!
//! This module wires up a cross-platform filesystem watcher (`notify`) on
//! the directory the runner writes its result artifact into, and turns
//! change events for that one file into [`ArtifactEvent`]s on an mpsc
//! channel.
//!
//! It does **not** decide whether a change belongs to the current
//! invocation; that is the correlator's job. It only narrows the firehose
//! of directory events down to "the artifact was touched".

pub mod watcher;

pub use watcher::{spawn_artifact_watcher, ArtifactEvent, WatcherHandle};
