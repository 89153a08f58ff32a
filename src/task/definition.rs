// src/task/definition.rs

//! Declarative task definition as handed over by the scheduler.
//!
//! A `TaskDefinition` is created once per scheduled attempt and never
//! mutated. It maps directly onto the JSON the scheduler produces:
//!
//! ```json
//! {
//!   "kind": "PYTHON",
//!   "parameters": {
//!     "rawScript": "print('${name}')",
//!     "localParams": [{ "prop": "name", "direct": "IN", "type": "VARCHAR", "value": "world" }]
//!   },
//!   "context": { "workingDir": "/tmp/exec/1", "appId": "1_2_3", "instanceId": 3, "tenant": "etl" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaskError};
use crate::types::{CommandType, DataType, Direction, TaskKind};

/// A single named parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "prop")]
    pub name: String,

    #[serde(rename = "direct", default)]
    pub direction: Direction,

    #[serde(rename = "type", default)]
    pub data_type: DataType,

    #[serde(default)]
    pub value: String,
}

impl Property {
    /// Convenience constructor for an `IN`/`VARCHAR` property.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::In,
            data_type: DataType::Varchar,
            value: value.into(),
        }
    }
}

/// Task-specific parameters: the payload template plus local parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskParameters {
    /// Payload template, e.g. a script body containing `${name}` tokens.
    #[serde(default)]
    pub raw_script: Option<String>,

    /// Locally scoped parameters, in declaration order.
    #[serde(default)]
    pub local_params: Vec<Property>,
}

impl TaskParameters {
    /// Parse task parameters from their JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Semantic validation performed at `initialize`.
    pub fn check(&self) -> Result<()> {
        let script = self.raw_script.as_deref().unwrap_or_default();
        if script.trim().is_empty() {
            return Err(TaskError::Validation(
                "raw script must be present and non-empty".to_string(),
            ));
        }

        for (idx, prop) in self.local_params.iter().enumerate() {
            if prop.name.trim().is_empty() {
                return Err(TaskError::Validation(format!(
                    "local parameter #{idx} has an empty name"
                )));
            }
        }

        Ok(())
    }

    /// Return a copy with the payload template normalised to `\n` line endings.
    pub fn normalized(&self) -> Self {
        Self {
            raw_script: self.raw_script.as_ref().map(|s| s.replace("\r\n", "\n")),
            local_params: self.local_params.clone(),
        }
    }

    /// Payload template, or an empty string if none was given.
    pub fn raw_script(&self) -> &str {
        self.raw_script.as_deref().unwrap_or_default()
    }
}

/// Where and as whom the task runs, plus scheduling metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub working_dir: PathBuf,
    pub app_id: String,
    pub instance_id: i64,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    /// Timeout in seconds; `None` means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub command_type: CommandType,
    #[serde(default)]
    pub schedule_time: Option<NaiveDateTime>,
}

impl ExecutionContext {
    pub fn new(working_dir: impl AsRef<Path>, app_id: impl Into<String>, instance_id: i64) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            app_id: app_id.into(),
            instance_id,
            tenant: String::new(),
            env_file: None,
            start_time: None,
            timeout_secs: None,
            command_type: CommandType::default(),
            schedule_time: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Immutable input for one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub kind: TaskKind,
    pub parameters: TaskParameters,
    /// User-defined global parameters.
    #[serde(default)]
    pub global_params: Vec<Property>,
    /// Parameters supplied when the run was started; visible to `$`-valued
    /// properties during resolution.
    #[serde(default)]
    pub defined_params: BTreeMap<String, String>,
    pub context: ExecutionContext,
}

impl TaskDefinition {
    /// Parse a full definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
