// src/config/loader.rs

use std::path::Path;

use tracing::warn;

use crate::config::model::TaskSource;
use crate::errors::{Result, RunwatchError};
use crate::fs::FileSystem;

/// Load a task source file and surface its runner invocations.
///
/// Fails with [`RunwatchError::MalformedConfig`] when the file cannot be
/// read or its lenient-JSON dialect cannot be parsed. Most callers want
/// [`load_task_source_or_empty`], which downgrades that to a warning.
pub fn load_task_source(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<TaskSource> {
    let path = path.as_ref();
    let contents = fs
        .read_to_string(path)
        .map_err(|e| RunwatchError::MalformedConfig(format!("{:?}: {e}", path)))?;

    let value = parse_lenient(&contents)
        .map_err(|e| RunwatchError::MalformedConfig(format!("{:?}: {e}", path)))?;

    Ok(TaskSource::from_value(&value))
}

/// Load a task source, treating a malformed file as an empty one.
///
/// A source that fails to parse is logged as a warning and contributes
/// zero tasks rather than failing the whole invocation.
pub fn load_task_source_or_empty(fs: &dyn FileSystem, path: impl AsRef<Path>) -> TaskSource {
    match load_task_source(fs, path.as_ref()) {
        Ok(source) => source,
        Err(e) => {
            warn!(error = %e, "ignoring malformed task source");
            TaskSource::default()
        }
    }
}

/// Parse JSON tolerating `//` line comments, `/* */` block comments and
/// trailing commas.
///
/// String literals are tokenized first so that a `//` inside a string
/// (e.g. a URL) is never mistaken for a comment.
pub fn parse_lenient(text: &str) -> serde_json::Result<serde_json::Value> {
    let stripped = strip_comments(text);
    let stripped = strip_trailing_commas(&stripped);
    serde_json::from_str(&stripped)
}

/// Replace comments with whitespace, preserving newlines so that error
/// positions stay meaningful.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                // Line comment: consume to end of line, keep the newline.
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            c => out.push(c),
        }
    }

    out
}

/// Remove commas that directly precede a closing `}` or `]`.
///
/// Must run after comment stripping; string literals are still protected.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '}' | ']' => {
                // Drop a comma separated from the closer only by whitespace.
                while matches!(out.chars().last(), Some(w) if w.is_whitespace()) {
                    out.pop();
                }
                if out.ends_with(',') {
                    out.pop();
                }
                out.push(c);
            }
            c => out.push(c),
        }
    }

    out
}
