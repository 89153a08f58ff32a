// src/exec/backend.rs

//! Pluggable executor capability.
//!
//! The task execution unit talks to an `Executor` instead of spawning
//! processes itself. Production code uses
//! [`ProcessExecutor`](super::process::ProcessExecutor); tests can supply a
//! fake that records requests and returns scripted outcomes.
//!
//! Every implementation must observe the cancellation token **before**
//! spawning anything: if it is already set, return
//! `ExecOutcome::Killed(KillReason::Cancelled)` without starting a process.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::exec::sink::LogSink;
use crate::task::definition::ExecutionContext;
use crate::types::TaskKind;

/// Exit code reported when the process was killed (cancel or timeout).
pub const EXIT_CODE_KILL: i32 = 137;

/// Exit code reported when there is no meaningful process exit code.
pub const EXIT_CODE_FAILURE: i32 = -1;

/// Everything an executor needs to run one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub payload: String,
    pub kind: TaskKind,
    /// Program used to run the payload file (e.g. `python3`, `sh`).
    pub interpreter: String,
    /// Extension of the payload file, without the dot.
    pub file_extension: String,
    pub working_dir: PathBuf,
    pub app_id: String,
    pub instance_id: i64,
    pub tenant: String,
    pub env_file: Option<PathBuf>,
    pub start_time: Option<NaiveDateTime>,
    pub timeout: Option<Duration>,
}

impl ExecRequest {
    /// Build a request from an execution context and a resolved payload.
    pub fn new(
        payload: String,
        kind: TaskKind,
        script: &ScriptSpec,
        context: &ExecutionContext,
    ) -> Self {
        Self {
            payload,
            kind,
            interpreter: script.interpreter.clone(),
            file_extension: script.file_extension.clone(),
            working_dir: context.working_dir.clone(),
            app_id: context.app_id.clone(),
            instance_id: context.instance_id,
            tenant: context.tenant.clone(),
            env_file: context.env_file.clone(),
            start_time: context.start_time,
            timeout: context.timeout(),
        }
    }
}

/// How a task kind turns its payload into a runnable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSpec {
    pub interpreter: String,
    pub file_extension: String,
}

impl ScriptSpec {
    pub fn new(interpreter: impl Into<String>, file_extension: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            file_extension: file_extension.into(),
        }
    }
}

/// Why a process was terminated by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReason {
    Cancelled,
    TimedOut,
}

/// What the executor observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The process exited on its own with this code.
    Exited(i32),
    /// The process was never spawned or was terminated by the executor.
    Killed(KillReason),
}

impl ExecOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            ExecOutcome::Exited(code) => code,
            ExecOutcome::Killed(_) => EXIT_CODE_KILL,
        }
    }
}

/// Boxed future returned by [`Executor::execute`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<ExecOutcome>> + Send + 'a>>;

/// Trait abstracting how a resolved payload is executed.
pub trait Executor: Send + Sync {
    /// Run `request` to completion, cancellation or timeout.
    ///
    /// Every line of process output is passed to `log`. An `Err` means the
    /// executor itself failed (e.g. could not write the payload file or spawn
    /// the process); the unit maps it to exit code `-1`.
    fn execute(
        &self,
        request: ExecRequest,
        cancel: CancellationToken,
        log: Arc<dyn LogSink>,
    ) -> ExecFuture<'_>;
}
