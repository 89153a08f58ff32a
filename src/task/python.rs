// src/task/python.rs

//! Python task: the payload is a Python script.

use crate::errors::Result;
use crate::exec::backend::ScriptSpec;
use crate::task::definition::{TaskDefinition, TaskParameters};
use crate::task::state::{ExecutionResult, TaskState};
use crate::task::unit::{ExecutionUnit, TaskDeps};
use crate::task::{Task, TaskFuture};
use crate::types::TaskKind;

pub struct PythonTask {
    unit: ExecutionUnit,
}

impl PythonTask {
    /// `interpreter` is the command used to run the script, e.g. `python3`.
    pub fn new(definition: TaskDefinition, deps: TaskDeps, interpreter: impl Into<String>) -> Self {
        let script = ScriptSpec::new(interpreter, "py");
        Self {
            unit: ExecutionUnit::new(TaskKind::Python, definition, script, deps),
        }
    }
}

impl Task for PythonTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Python
    }

    fn initialize(&self) -> Result<()> {
        self.unit.initialize()
    }

    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.unit.run())
    }

    fn cancel(&self) {
        self.unit.cancel()
    }

    fn parameters(&self) -> Option<TaskParameters> {
        self.unit.parameters()
    }

    fn state(&self) -> TaskState {
        self.unit.state()
    }

    fn result(&self) -> Option<ExecutionResult> {
        self.unit.result()
    }
}
