// tests/process_executor.rs
//
// Runs real `sh` processes; unix only.
#![cfg(unix)]

mod common;
use crate::common::builders::TaskDefinitionBuilder;
use crate::common::{init_tracing, with_timeout, MemoryLogSink, RecordingStatusSink};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use taskunit::exec::process::command_paths;
use taskunit::exec::{
    ExecOutcome, ExecRequest, Executor, KillReason, ProcessExecutor, ProcessOptions, ScriptSpec,
    EXIT_CODE_KILL,
};
use taskunit::task::{ShellTask, Task, TaskDeps, TaskRef, TerminalState};
use taskunit::types::TaskKind;

type TestResult = Result<(), Box<dyn Error>>;

fn executor() -> ProcessExecutor {
    ProcessExecutor::new(ProcessOptions {
        run_as_tenant: false,
        output_drain: Duration::from_millis(200),
    })
}

fn shell_task(builder: TaskDefinitionBuilder, work: &Path) -> (TaskRef, MemoryLogSink) {
    let logs = MemoryLogSink::new();
    let deps = TaskDeps {
        executor: Arc::new(executor()),
        log_sink: Arc::new(logs.clone()),
        status_sink: Arc::new(RecordingStatusSink::new()),
    };
    let definition = builder.kind(TaskKind::Shell).working_dir(work).build();
    (Arc::new(ShellTask::new(definition, deps, "sh")), logs)
}

async fn wait_for_line(logs: &MemoryLogSink, needle: &str) {
    for _ in 0..200 {
        if logs.lines().iter().any(|l| l == needle) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("line {needle:?} never appeared; got {:?}", logs.lines());
}

#[tokio::test]
async fn runs_script_and_streams_output() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;

    let (task, logs) = shell_task(
        TaskDefinitionBuilder::new("echo hello ${name}\necho oops >&2").local("name", "world"),
        tmp.path(),
    );
    task.initialize()?;
    let result = with_timeout(task.run()).await;

    assert_eq!(result.state, TerminalState::Succeeded);
    assert_eq!(result.exit_code, 0);

    let lines = logs.lines();
    assert!(lines.contains(&"hello world".to_string()), "lines: {lines:?}");
    assert!(lines.contains(&"oops".to_string()), "lines: {lines:?}");

    let payload = std::fs::read_to_string(tmp.path().join("1_1_1_node.sh"))?;
    assert_eq!(payload, "echo hello world\necho oops >&2");
    assert!(tmp.path().join("1_1_1.command").exists());
    Ok(())
}

#[tokio::test]
async fn reports_process_exit_code() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;

    let (task, _logs) = shell_task(TaskDefinitionBuilder::new("exit 3"), tmp.path());
    task.initialize()?;
    let result = with_timeout(task.run()).await;

    assert_eq!(result.state, TerminalState::Failed);
    assert_eq!(result.exit_code, 3);
    Ok(())
}

#[tokio::test]
async fn sources_the_env_file() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    let env_file = tmp.path().join("env.sh");
    std::fs::write(&env_file, "export GREETING=bonjour\n")?;

    let (task, logs) = shell_task(
        TaskDefinitionBuilder::new("echo \"$GREETING\"").env_file(&env_file),
        &tmp.path().join("work"),
    );
    task.initialize()?;
    let result = with_timeout(task.run()).await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(logs.lines(), vec!["bonjour"]);
    Ok(())
}

#[tokio::test]
async fn cancel_kills_the_running_process() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;

    let (task, logs) = shell_task(
        TaskDefinitionBuilder::new("echo started\nsleep 30"),
        tmp.path(),
    );
    task.initialize()?;

    let runner = {
        let task = Arc::clone(&task);
        tokio::spawn(async move { task.run().await })
    };

    wait_for_line(&logs, "started").await;
    task.cancel();

    let result = with_timeout(runner).await?;
    assert_eq!(result.state, TerminalState::Cancelled);
    assert_eq!(result.exit_code, EXIT_CODE_KILL);
    Ok(())
}

#[tokio::test]
async fn cancel_kills_processes_started_by_the_script() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    let marker = tmp.path().join("marker");

    let (task, logs) = shell_task(
        TaskDefinitionBuilder::new("echo started\nsh -c 'sleep 1; echo side-effect > marker'"),
        tmp.path(),
    );
    task.initialize()?;

    let runner = {
        let task = Arc::clone(&task);
        tokio::spawn(async move { task.run().await })
    };

    wait_for_line(&logs, "started").await;
    task.cancel();

    let result = with_timeout(runner).await?;
    assert_eq!(result.state, TerminalState::Cancelled);

    // Outlive the grandchild's sleep; it must have been killed with the group.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "grandchild survived cancellation");
    Ok(())
}

#[tokio::test]
async fn invalid_utf8_output_does_not_stop_the_readers() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;

    let script = "printf 'bad \\377\\n'\n\
                  i=0\n\
                  while [ $i -lt 20000 ]; do echo line $i; i=$((i + 1)); done\n\
                  exit 0";
    let (task, logs) = shell_task(TaskDefinitionBuilder::new(script), tmp.path());
    task.initialize()?;
    let result = with_timeout(task.run()).await;

    assert_eq!(result.state, TerminalState::Succeeded);
    assert_eq!(result.exit_code, 0);

    let lines = logs.lines();
    assert_eq!(lines.len(), 20001);
    assert_eq!(lines[0], "bad \u{FFFD}");
    assert_eq!(lines[20000], "line 19999");
    Ok(())
}

#[tokio::test]
async fn timeout_kills_the_process_and_fails() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;

    let (task, _logs) = shell_task(
        TaskDefinitionBuilder::new("sleep 30").timeout_secs(1),
        tmp.path(),
    );
    task.initialize()?;
    let result = with_timeout(task.run()).await;

    assert_eq!(result.state, TerminalState::Failed);
    assert_eq!(result.exit_code, EXIT_CODE_KILL);
    Ok(())
}

#[tokio::test]
async fn cancelled_token_spawns_nothing_and_writes_nothing() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    let work = tmp.path().join("work");

    let definition = TaskDefinitionBuilder::new("echo never")
        .kind(TaskKind::Shell)
        .working_dir(&work)
        .build();
    let request = ExecRequest::new(
        definition.parameters.raw_script().to_string(),
        TaskKind::Shell,
        &ScriptSpec::new("sh", "sh"),
        &definition.context,
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let logs = MemoryLogSink::new();
    let outcome = executor()
        .execute(request.clone(), cancel, Arc::new(logs.clone()))
        .await?;

    assert_eq!(outcome, ExecOutcome::Killed(KillReason::Cancelled));
    assert_eq!(outcome.exit_code(), EXIT_CODE_KILL);
    assert!(!work.exists());

    let (script, wrapper) = command_paths(&request);
    assert!(!script.exists());
    assert!(!wrapper.exists());
    assert!(logs.lines().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_interpreter_surfaces_as_process_failure() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;

    let definition = TaskDefinitionBuilder::new("whatever")
        .kind(TaskKind::Shell)
        .working_dir(tmp.path())
        .build();
    let request = ExecRequest::new(
        "whatever".to_string(),
        TaskKind::Shell,
        &ScriptSpec::new("taskunit-no-such-interpreter", "sh"),
        &definition.context,
    );

    let outcome = executor()
        .execute(request, CancellationToken::new(), Arc::new(MemoryLogSink::new()))
        .await?;

    // `exec` of an unknown command makes sh exit with 127.
    assert_eq!(outcome, ExecOutcome::Exited(127));
    Ok(())
}
