// src/task/factory.rs

//! Builds the right task kind for a definition.

use std::sync::Arc;

use crate::config::{ConfigFile, InterpreterSection};
use crate::exec::backend::Executor;
use crate::exec::process::{ProcessExecutor, ProcessOptions};
use crate::exec::sink::{LogSink, StatusSink, TracingLogSink, TracingStatusSink};
use crate::task::definition::TaskDefinition;
use crate::task::python::PythonTask;
use crate::task::shell::ShellTask;
use crate::task::unit::TaskDeps;
use crate::task::TaskRef;
use crate::types::TaskKind;

/// Creates tasks that share one executor and status sink.
///
/// Output lines go to the factory's log sink if one was set, otherwise to a
/// per-task [`TracingLogSink`] tagged with the task's app id.
pub struct TaskFactory {
    executor: Arc<dyn Executor>,
    status_sink: Arc<dyn StatusSink>,
    log_sink: Option<Arc<dyn LogSink>>,
    interpreters: InterpreterSection,
}

impl TaskFactory {
    pub fn new(
        executor: Arc<dyn Executor>,
        status_sink: Arc<dyn StatusSink>,
        interpreters: InterpreterSection,
    ) -> Self {
        Self {
            executor,
            status_sink,
            log_sink: None,
            interpreters,
        }
    }

    /// Production factory: a [`ProcessExecutor`] configured from `cfg`.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let executor = ProcessExecutor::new(ProcessOptions::from(&cfg.executor));
        Self::new(
            Arc::new(executor),
            Arc::new(TracingStatusSink),
            cfg.interpreter.clone(),
        )
    }

    /// Send all task output to `sink` instead of `tracing`.
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn create(&self, definition: TaskDefinition) -> TaskRef {
        let log_sink = match &self.log_sink {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(TracingLogSink::new(definition.context.app_id.clone())),
        };
        let deps = TaskDeps {
            executor: Arc::clone(&self.executor),
            log_sink,
            status_sink: Arc::clone(&self.status_sink),
        };

        match definition.kind {
            TaskKind::Python => Arc::new(PythonTask::new(
                definition,
                deps,
                self.interpreters.python.clone(),
            )),
            TaskKind::Shell => Arc::new(ShellTask::new(
                definition,
                deps,
                self.interpreters.shell.clone(),
            )),
        }
    }
}
