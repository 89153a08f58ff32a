// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod params;
pub mod task;
pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_and_validate, load_or_default};
use crate::task::{ExecutionResult, TaskDefinition, TaskFactory, resolve_payload};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - task definition loading
/// - the task factory / process executor
/// - Ctrl-C handling (cancels the running task)
///
/// Returns `None` for `--dry-run`.
pub async fn run(args: CliArgs) -> Result<Option<ExecutionResult>> {
    let cfg = load_config(args.config.as_deref())?;

    let definition_json = std::fs::read_to_string(&args.task)
        .with_context(|| format!("reading task definition {}", args.task))?;
    let definition = TaskDefinition::from_json(&definition_json)?;

    if args.dry_run {
        print_dry_run(&definition)?;
        return Ok(None);
    }

    let factory = TaskFactory::from_config(&cfg);
    let task = factory.create(definition);
    task.initialize()?;

    // Ctrl-C -> cancel the attempt; `run` then finishes as Cancelled.
    {
        let task = task.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            task.cancel();
        });
    }

    let result = task.run().await;
    info!(
        state = ?result.state,
        exit_code = result.exit_code,
        "task attempt complete"
    );
    println!("{}", serde_json::to_string(&result)?);

    Ok(Some(result))
}

fn load_config(path: Option<&str>) -> Result<ConfigFile> {
    let cfg = match path {
        Some(path) => load_and_validate(Path::new(path))
            .with_context(|| format!("loading config {path}"))?,
        None => load_or_default(default_config_path())?,
    };
    Ok(cfg)
}

/// Validate the definition and print the resolved payload.
fn print_dry_run(definition: &TaskDefinition) -> Result<()> {
    let parameters = definition.parameters.normalized();
    parameters.check()?;
    let payload = resolve_payload(definition, &parameters)?;

    println!("taskunit dry-run");
    println!("  kind: {}", definition.kind);
    println!("  app_id: {}", definition.context.app_id);
    println!("  working_dir: {}", definition.context.working_dir.display());
    if let Some(timeout) = definition.context.timeout() {
        println!("  timeout: {timeout:?}");
    }
    println!();
    println!("{payload}");

    Ok(())
}
