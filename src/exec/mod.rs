// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `Executor` trait the task unit talks to, along
//!   with the request/outcome types and the reserved exit codes.
//! - [`process`] is the production `ProcessExecutor`, using
//!   `tokio::process::Command`; tests replace it with a fake.
//! - [`sink`] defines where process output and status updates go.

pub mod backend;
pub mod process;
pub mod sink;

pub use backend::{
    EXIT_CODE_FAILURE, EXIT_CODE_KILL, ExecFuture, ExecOutcome, ExecRequest, Executor,
    KillReason, ScriptSpec,
};
pub use process::{ProcessExecutor, ProcessOptions};
pub use sink::{LogSink, StatusSink, StatusUpdate, TracingLogSink, TracingStatusSink};
