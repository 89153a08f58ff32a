// src/types.rs

//! Small shared enums used by task definitions and configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which kind of task a definition describes.
///
/// Each kind maps to one `Task` implementation in [`crate::task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskKind {
    Python,
    Shell,
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(TaskKind::Python),
            "shell" => Ok(TaskKind::Shell),
            other => Err(format!(
                "invalid task kind: {other} (expected \"python\" or \"shell\")"
            )),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Python => f.write_str("PYTHON"),
            TaskKind::Shell => f.write_str("SHELL"),
        }
    }
}

/// Direction of a task parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::In
    }
}

/// Declared type of a task parameter.
///
/// Values are always carried as strings; the type is informational for
/// downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Varchar,
    Integer,
    Long,
    Float,
    Double,
    Date,
    Time,
    Timestamp,
    Boolean,
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Varchar
    }
}

/// The command that caused this task attempt to be scheduled.
///
/// Only `ComplementData` changes parameter resolution: it pins the business
/// date to the schedule time instead of the day before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    StartProcess,
    StartCurrentTaskProcess,
    RecoverToleranceFaultProcess,
    RecoverSuspendedProcess,
    StartFailureTaskProcess,
    ComplementData,
    Scheduler,
    RepeatRunning,
}

impl Default for CommandType {
    fn default() -> Self {
        CommandType::StartProcess
    }
}

impl FromStr for CommandType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "start_process" => Ok(CommandType::StartProcess),
            "start_current_task_process" => Ok(CommandType::StartCurrentTaskProcess),
            "recover_tolerance_fault_process" => Ok(CommandType::RecoverToleranceFaultProcess),
            "recover_suspended_process" => Ok(CommandType::RecoverSuspendedProcess),
            "start_failure_task_process" => Ok(CommandType::StartFailureTaskProcess),
            "complement_data" => Ok(CommandType::ComplementData),
            "scheduler" => Ok(CommandType::Scheduler),
            "repeat_running" => Ok(CommandType::RepeatRunning),
            other => Err(format!("invalid command type: {other}")),
        }
    }
}
