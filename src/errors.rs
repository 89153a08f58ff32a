// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! There is no cancellation variant: a cancelled task is a normal
//! terminal outcome (`TerminalState::Cancelled`), not an error.

use thiserror::Error;

use crate::task::state::TaskState;

#[derive(Error, Debug)]
pub enum TaskError {
    /// The task definition failed semantic validation at `initialize`.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resolving parameters or invoking the executor failed.
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TaskState, to: TaskState },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskError>;
