// src/task/state.rs

//! Lifecycle states and the terminal result of an execution attempt.

use serde::Serialize;

use crate::exec::backend::{EXIT_CODE_FAILURE, EXIT_CODE_KILL};

/// Lifecycle state of a task execution unit.
///
/// ```text
/// Created -> Initialized -> Running -> { Succeeded | Failed | Cancelled }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskState {
    Created,
    Initialized,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Created, Initialized)
                | (Initialized, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

/// The three ways an attempt can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TerminalState {
    Succeeded,
    Failed,
    Cancelled,
}

impl From<TerminalState> for TaskState {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Succeeded => TaskState::Succeeded,
            TerminalState::Failed => TaskState::Failed,
            TerminalState::Cancelled => TaskState::Cancelled,
        }
    }
}

/// Terminal outcome handed back to the scheduler, once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub state: TerminalState,
    /// Failure message for internal failures (`exit_code == -1`).
    pub cause: Option<String>,
}

impl ExecutionResult {
    /// Map a process exit code: `0` succeeds, anything else fails.
    pub fn from_exit_code(exit_code: i32) -> Self {
        let state = if exit_code == 0 {
            TerminalState::Succeeded
        } else {
            TerminalState::Failed
        };
        Self {
            exit_code,
            state,
            cause: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            exit_code: EXIT_CODE_KILL,
            state: TerminalState::Cancelled,
            cause: None,
        }
    }

    /// Failure before or without a meaningful process exit code.
    pub fn internal_failure(cause: impl Into<String>) -> Self {
        Self {
            exit_code: EXIT_CODE_FAILURE,
            state: TerminalState::Failed,
            cause: Some(cause.into()),
        }
    }

    pub fn is_internal_failure(&self) -> bool {
        self.exit_code == EXIT_CODE_FAILURE
    }
}
