// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskunit`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskunit",
    version,
    about = "Run a single scheduled task attempt from its JSON definition.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task definition (JSON).
    #[arg(long, value_name = "PATH")]
    pub task: String,

    /// Path to the worker config file (TOML).
    ///
    /// If omitted, `taskunit.toml` in the current directory is used when it
    /// exists; otherwise built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKUNIT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the resolved payload, but don't execute it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
