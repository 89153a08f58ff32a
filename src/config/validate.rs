// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.executor, raw.interpreter))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_executor(cfg)?;
    validate_interpreters(cfg)?;
    Ok(())
}

fn validate_executor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.executor.output_drain_ms == 0 {
        return Err(TaskError::ConfigError(
            "[executor].output_drain_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_interpreters(cfg: &RawConfigFile) -> Result<()> {
    let entries = [
        ("python", &cfg.interpreter.python),
        ("shell", &cfg.interpreter.shell),
    ];
    for (kind, command) in entries {
        if command.trim().is_empty() {
            return Err(TaskError::ConfigError(format!(
                "[interpreter].{kind} must not be empty"
            )));
        }
    }
    Ok(())
}
