// src/task/mod.rs

//! Task kinds and their common lifecycle.
//!
//! Schedulers only ever hold a [`TaskRef`] (`Arc<dyn Task>`). Each task kind
//! implements [`Task`] by delegating to an [`ExecutionUnit`] configured with
//! its own interpreter and payload file extension.
//!
//! - [`definition`] is the declarative input from the scheduler.
//! - [`state`] holds lifecycle states and the terminal `ExecutionResult`.
//! - [`unit`] is the lifecycle state machine.
//! - [`python`] / [`shell`] are the task kinds.
//! - [`factory`] picks the kind for a definition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod definition;
pub mod factory;
pub mod python;
pub mod shell;
pub mod state;
pub mod unit;

pub use definition::{ExecutionContext, Property, TaskDefinition, TaskParameters};
pub use factory::TaskFactory;
pub use python::PythonTask;
pub use shell::ShellTask;
pub use state::{ExecutionResult, TaskState, TerminalState};
pub use unit::{ExecutionUnit, TaskDeps, resolve_payload};

use crate::errors::Result;
use crate::types::TaskKind;

/// Boxed future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = ExecutionResult> + Send + 'a>>;

/// Shared handle to a task, so `cancel` can be called while `run` is pending.
pub type TaskRef = Arc<dyn Task>;

/// Lifecycle shared by every task kind.
pub trait Task: Send + Sync {
    fn kind(&self) -> TaskKind;

    /// Validate the definition. No process is spawned if this fails.
    fn initialize(&self) -> Result<()>;

    /// Run the attempt to a terminal state. Never fails; see
    /// [`ExecutionResult`].
    fn run(&self) -> TaskFuture<'_>;

    /// Request cancellation. Idempotent and safe to call concurrently with
    /// `run`.
    fn cancel(&self);

    /// Validated parameters, once initialized.
    fn parameters(&self) -> Option<TaskParameters>;

    fn state(&self) -> TaskState;

    fn result(&self) -> Option<ExecutionResult>;
}
