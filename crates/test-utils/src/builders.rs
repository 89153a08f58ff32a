#![allow(dead_code)]

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use taskunit::task::{ExecutionContext, Property, TaskDefinition, TaskParameters};
use taskunit::types::{CommandType, TaskKind};

/// Schedule time used by default in tests: 2024-01-02 00:00:00.
pub fn default_schedule_time() -> NaiveDateTime {
    datetime(2024, 1, 2, 0, 0, 0)
}

pub fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .expect("valid test datetime")
}

/// Builder for `TaskDefinition` to simplify test setup.
pub struct TaskDefinitionBuilder {
    definition: TaskDefinition,
}

impl TaskDefinitionBuilder {
    /// A python task with the given payload template.
    pub fn new(script: &str) -> Self {
        let mut context = ExecutionContext::new("/tmp/taskunit-test", "1_1_1", 1);
        context.tenant = "tester".to_string();
        context.command_type = CommandType::Scheduler;
        context.schedule_time = Some(default_schedule_time());

        Self {
            definition: TaskDefinition {
                kind: TaskKind::Python,
                parameters: TaskParameters {
                    raw_script: Some(script.to_string()),
                    local_params: vec![],
                },
                global_params: vec![],
                defined_params: Default::default(),
                context,
            },
        }
    }

    pub fn kind(mut self, kind: TaskKind) -> Self {
        self.definition.kind = kind;
        self
    }

    pub fn no_script(mut self) -> Self {
        self.definition.parameters.raw_script = None;
        self
    }

    pub fn local(mut self, name: &str, value: &str) -> Self {
        self.definition
            .parameters
            .local_params
            .push(Property::new(name, value));
        self
    }

    pub fn global(mut self, name: &str, value: &str) -> Self {
        self.definition.global_params.push(Property::new(name, value));
        self
    }

    pub fn defined(mut self, name: &str, value: &str) -> Self {
        self.definition
            .defined_params
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.definition.context.working_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn app_id(mut self, app_id: &str) -> Self {
        self.definition.context.app_id = app_id.to_string();
        self
    }

    pub fn env_file(mut self, path: impl AsRef<Path>) -> Self {
        self.definition.context.env_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.definition.context.timeout_secs = Some(secs);
        self
    }

    pub fn command_type(mut self, command_type: CommandType) -> Self {
        self.definition.context.command_type = command_type;
        self
    }

    pub fn schedule_time(mut self, at: Option<NaiveDateTime>) -> Self {
        self.definition.context.schedule_time = at;
        self
    }

    pub fn build(self) -> TaskDefinition {
        self.definition
    }
}
