// src/exec/sink.rs

//! Output and status sinks.
//!
//! Both are handed to a task at construction time. Implementations must be
//! safe to call from several Tokio tasks at once: stdout and stderr lines are
//! forwarded by separate reader tasks.

use tracing::info;

use crate::task::state::TaskState;

/// Receives every line of process output.
pub trait LogSink: Send + Sync {
    fn log_line(&self, line: &str);
}

/// Forwards process output into `tracing`.
#[derive(Debug, Clone)]
pub struct TracingLogSink {
    app_id: String,
}

impl TracingLogSink {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }
}

impl LogSink for TracingLogSink {
    fn log_line(&self, line: &str) {
        info!(app_id = %self.app_id, "{}", line);
    }
}

/// A lifecycle change reported by a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub app_id: String,
    pub instance_id: i64,
    pub state: TaskState,
    /// Set once the task reached a terminal state.
    pub exit_code: Option<i32>,
}

/// Receives status updates (persistence, metrics, the scheduler...).
pub trait StatusSink: Send + Sync {
    fn report(&self, update: &StatusUpdate);
}

/// Logs status updates and stores nothing.
#[derive(Debug, Clone, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn report(&self, update: &StatusUpdate) {
        info!(
            app_id = %update.app_id,
            instance_id = update.instance_id,
            state = ?update.state,
            exit_code = ?update.exit_code,
            "task status changed"
        );
    }
}
