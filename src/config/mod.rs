// src/config/mod.rs

//! Task source loading.
//!
//! The task source is a JSON file mapping task name -> command string,
//! maintained by hand and therefore tolerated in its lenient dialect
//! (`//` and `/* */` comments, trailing commas). Only entries whose
//! command matches the fixed runner-invocation pattern are surfaced;
//! everything else in the file is somebody else's business.
//!
//! - [`loader`] reads and leniently parses the file.
//! - [`model`] filters the parsed value down to runnable [`model::TaskDefinition`]s.

pub mod loader;
pub mod model;

pub use loader::{load_task_source, load_task_source_or_empty, parse_lenient};
pub use model::{split_command, TaskDefinition, TaskSource, RUNNER_COMMAND_PATTERN};
