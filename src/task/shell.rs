// src/task/shell.rs

//! Shell task: the payload is a POSIX shell script.

use crate::errors::Result;
use crate::exec::backend::ScriptSpec;
use crate::task::definition::{TaskDefinition, TaskParameters};
use crate::task::state::{ExecutionResult, TaskState};
use crate::task::unit::{ExecutionUnit, TaskDeps};
use crate::task::{Task, TaskFuture};
use crate::types::TaskKind;

pub struct ShellTask {
    unit: ExecutionUnit,
}

impl ShellTask {
    pub fn new(definition: TaskDefinition, deps: TaskDeps, shell: impl Into<String>) -> Self {
        let script = ScriptSpec::new(shell, "sh");
        Self {
            unit: ExecutionUnit::new(TaskKind::Shell, definition, script, deps),
        }
    }
}

impl Task for ShellTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Shell
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
