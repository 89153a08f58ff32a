// src/config/model.rs

use serde::Deserialize;

/// Worker configuration as read from a TOML file.
///
/// ```toml
/// [executor]
/// run_as_tenant = false
/// output_drain_ms = 1000
///
/// [interpreter]
/// python = "python3"
/// shell = "sh"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub executor: ExecutorSection,

    #[serde(default)]
    pub interpreter: InterpreterSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// or [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub executor: ExecutorSection,
    pub interpreter: InterpreterSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(executor: ExecutorSection, interpreter: InterpreterSection) -> Self {
        Self {
            executor,
            interpreter,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(ExecutorSection::default(), InterpreterSection::default())
    }
}

/// `[executor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    /// Run task processes as the task's tenant (`sudo -u <tenant>`).
    #[serde(default)]
    pub run_as_tenant: bool,

    /// How long to keep reading process output after the process is gone.
    #[serde(default = "default_output_drain_ms")]
    pub output_drain_ms: u64,
}

fn default_output_drain_ms() -> u64 {
    1000
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            run_as_tenant: false,
            output_drain_ms: default_output_drain_ms(),
        }
    }
}

/// `[interpreter]` section: the command used for each task kind.
#[derive(Debug, Clone, Deserialize)]
pub struct InterpreterSection {
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for InterpreterSection {
    fn default() -> Self {
        Self {
            python: default_python(),
            shell: default_shell(),
        }
    }
}
