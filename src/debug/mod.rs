// src/debug/mod.rs

//! Debug session control.
//!
//! Debug-mode runs need three things the plain execution path does not:
//!
//! - a free local port the runner can expose its inspector protocol on
//!   ([`port`]), claimed *before* the subprocess is told about it so
//!   concurrent instances cannot collide;
//! - bounded polling of the inspector discovery endpoint ([`inspector`]);
//!   polling the endpoint is authoritative once the subprocess accepts
//!   connections, unlike scraping output through nested process layers;
//! - termination of the whole process group with a force-kill escalation,
//!   plus bookkeeping for the debugger-terminated notification
//!   ([`session`]).

pub mod inspector;
pub mod port;
pub mod session;

pub use inspector::{poll_inspector_ready, InspectorTarget};
pub use port::{find_free_port, PORT_PROBE_ATTEMPTS};
pub use session::{kill_process_group, DebuggerEvents, ForceKillGuard, TerminationListener};
