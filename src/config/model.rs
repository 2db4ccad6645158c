// src/config/model.rs

//! Task source model: which entries of the task file become runnable tasks.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Commands that invoke the runner, optionally through `npx`.
///
/// Only task entries matching this pattern are surfaced; other entries in
/// the same file (lint scripts, build steps, non-string values) are ignored.
pub const RUNNER_COMMAND_PATTERN: &str = r"^(?:npx\s+)?testflow(?:\s|$)";

fn runner_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(RUNNER_COMMAND_PATTERN).expect("valid runner pattern"))
}

/// One surfaced task: a name plus the runner invocation split into argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub name: String,
    /// The program to spawn (first word of the command).
    pub program: String,
    /// Remaining argv, passed as a discrete vector, never through a shell.
    pub args: Vec<String>,
}

/// The surfaced view of a task source file.
#[derive(Debug, Clone, Default)]
pub struct TaskSource {
    pub tasks: BTreeMap<String, TaskDefinition>,
}

impl TaskSource {
    /// Filter a parsed task file down to runner invocations.
    ///
    /// The file is a JSON object mapping task name -> command string. Entries
    /// whose value is not a string, or whose command does not match
    /// [`RUNNER_COMMAND_PATTERN`], contribute nothing.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut tasks = BTreeMap::new();

        let Some(entries) = value.as_object() else {
            debug!("task source is not a JSON object; surfacing zero tasks");
            return Self { tasks };
        };

        for (name, entry) in entries {
            let Some(command) = entry.as_str() else {
                debug!(task = %name, "task source entry is not a string; skipping");
                continue;
            };

            let command = command.trim();
            if !runner_pattern().is_match(command) {
                debug!(task = %name, "command does not invoke the runner; skipping");
                continue;
            }

            let mut argv = split_command(command);
            if argv.is_empty() {
                continue;
            }
            let program = argv.remove(0);

            tasks.insert(
                name.clone(),
                TaskDefinition {
                    name: name.clone(),
                    program,
                    args: argv,
                },
            );
        }

        Self { tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }
}

/// Split a command string into argv without involving a shell.
///
/// Handles single and double quotes; no variable expansion, globbing or
/// escapes beyond `\"` inside double quotes. Runner invocations in task
/// files are simple enough that this covers them.
pub fn split_command(command: &str) -> Vec<String> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' && q == '"' {
                    if let Some(&next) = chars.peek() {
                        if next == '"' || next == '\\' {
                            current.push(next);
                            chars.next();
                            continue;
                        }
                    }
                    current.push(c);
                } else if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        argv.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }

    if in_word {
        argv.push(current);
    }

    argv
}
