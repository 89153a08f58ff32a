// tests/unit_lifecycle.rs

mod common;
use crate::common::builders::TaskDefinitionBuilder;
use crate::common::{init_tracing, recording_deps, with_timeout, FakeBehaviour, FakeExecutor};

use std::error::Error;
use std::sync::Arc;

use taskunit::config::InterpreterSection;
use taskunit::errors::TaskError;
use taskunit::exec::{EXIT_CODE_FAILURE, EXIT_CODE_KILL};
use taskunit::task::{
    PythonTask, ShellTask, Task, TaskFactory, TaskRef, TaskState, TerminalState,
};
use taskunit::types::TaskKind;

type TestResult = Result<(), Box<dyn Error>>;

fn python_task(builder: TaskDefinitionBuilder, executor: &FakeExecutor) -> PythonTask {
    let (deps, _logs, _statuses) = recording_deps(Arc::new(executor.clone()));
    PythonTask::new(builder.build(), deps, "python3")
}

#[tokio::test]
async fn resolves_payload_and_succeeds_on_zero_exit() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(
        TaskDefinitionBuilder::new("echo ${name}").local("name", "world"),
        &executor,
    );

    task.initialize()?;
    assert_eq!(task.state(), TaskState::Initialized);

    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Succeeded);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.cause, None);
    assert_eq!(task.state(), TaskState::Succeeded);

    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payload, "echo world");
    assert_eq!(requests[0].interpreter, "python3");
    assert_eq!(requests[0].file_extension, "py");
    assert_eq!(requests[0].app_id, "1_1_1");
    Ok(())
}

#[tokio::test]
async fn unresolved_placeholder_is_passed_through() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(TaskDefinitionBuilder::new("echo ${missing}"), &executor);

    task.initialize()?;
    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Succeeded);
    assert_eq!(executor.requests()[0].payload, "echo ${missing}");
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_code_fails_with_that_code() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(3));
    let task = python_task(TaskDefinitionBuilder::new("exit 3"), &executor);

    task.initialize()?;
    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Failed);
    assert_eq!(result.exit_code, 3);
    assert!(!result.is_internal_failure());
    Ok(())
}

#[tokio::test]
async fn executor_fault_becomes_internal_failure() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::Fault("spawn failed".to_string()));
    let task = python_task(TaskDefinitionBuilder::new("print(1)"), &executor);

    task.initialize()?;
    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Failed);
    assert_eq!(result.exit_code, EXIT_CODE_FAILURE);
    assert!(result.is_internal_failure());
    assert!(result.cause.unwrap_or_default().contains("spawn failed"));
    assert_eq!(task.state(), TaskState::Failed);
    Ok(())
}

#[tokio::test]
async fn cancel_before_run_never_spawns() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(TaskDefinitionBuilder::new("print(1)"), &executor);

    task.initialize()?;
    task.cancel();
    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Cancelled);
    assert_eq!(result.exit_code, EXIT_CODE_KILL);
    assert_eq!(executor.spawn_count(), 0);
    assert!(executor.requests().is_empty());
    assert_eq!(task.state(), TaskState::Cancelled);
    assert!(task.state().is_terminal());
    Ok(())
}

#[tokio::test]
async fn cancel_before_run_wins_over_a_blank_payload() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(
        TaskDefinitionBuilder::new("${body}").local("body", " "),
        &executor,
    );

    task.initialize()?;
    task.cancel();
    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Cancelled);
    assert_eq!(result.exit_code, EXIT_CODE_KILL);
    assert_eq!(result.cause, None);
    assert!(executor.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn cancelling_twice_is_the_same_as_once() -> TestResult {
    init_tracing();

    let once = FakeExecutor::new(FakeBehaviour::exit(0));
    let task_once = python_task(TaskDefinitionBuilder::new("print(1)"), &once);
    task_once.initialize()?;
    task_once.cancel();
    let first = task_once.run().await;

    let twice = FakeExecutor::new(FakeBehaviour::exit(0));
    let task_twice = python_task(TaskDefinitionBuilder::new("print(1)"), &twice);
    task_twice.initialize()?;
    task_twice.cancel();
    task_twice.cancel();
    let second = task_twice.run().await;

    assert_eq!(first, second);
    assert_eq!(once.spawn_count(), twice.spawn_count());
    Ok(())
}

#[tokio::test]
async fn cancel_while_running_ends_cancelled() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::WaitForCancel);
    let (deps, _logs, _statuses) = recording_deps(Arc::new(executor.clone()));
    let task: TaskRef = Arc::new(PythonTask::new(
        TaskDefinitionBuilder::new("import time; time.sleep(60)").build(),
        deps,
        "python3",
    ));

    task.initialize()?;

    let runner = {
        let task = Arc::clone(&task);
        tokio::spawn(async move { task.run().await })
    };

    with_timeout(executor.wait_started()).await;
    assert_eq!(task.state(), TaskState::Running);

    task.cancel();
    let result = with_timeout(runner).await?;

    assert_eq!(result.state, TerminalState::Cancelled);
    assert_eq!(result.exit_code, EXIT_CODE_KILL);
    assert_eq!(executor.spawn_count(), 1);
    assert_eq!(task.state(), TaskState::Cancelled);
    Ok(())
}

#[tokio::test]
async fn timeout_kill_without_cancel_is_a_failure() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::TimeOut);
    let task = python_task(
        TaskDefinitionBuilder::new("import time; time.sleep(60)").timeout_secs(1),
        &executor,
    );

    task.initialize()?;
    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Failed);
    assert_eq!(result.exit_code, EXIT_CODE_KILL);
    Ok(())
}

#[tokio::test]
async fn blank_template_is_a_validation_error() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(TaskDefinitionBuilder::new("  \r\n "), &executor);

    let err = task.initialize().unwrap_err();
    assert!(matches!(err, TaskError::Validation(_)), "got {err:?}");
    assert_eq!(task.state(), TaskState::Created);

    let result = task.run().await;
    assert_eq!(result.exit_code, EXIT_CODE_FAILURE);
    assert_eq!(task.state(), TaskState::Created, "never reaches Running");
    assert!(executor.requests().is_empty());
    assert_eq!(executor.spawn_count(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_template_is_a_validation_error() {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(TaskDefinitionBuilder::new("unused").no_script(), &executor);

    let err = task.initialize().unwrap_err();
    assert!(matches!(err, TaskError::Validation(_)), "got {err:?}");
    assert!(task.parameters().is_none());
}

#[tokio::test]
async fn local_parameter_without_name_is_rejected() {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(
        TaskDefinitionBuilder::new("print(1)").local(" ", "x"),
        &executor,
    );

    assert!(matches!(task.initialize(), Err(TaskError::Validation(_))));
}

#[tokio::test]
async fn definition_of_another_kind_is_rejected() {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(
        TaskDefinitionBuilder::new("echo hi").kind(TaskKind::Shell),
        &executor,
    );

    assert!(matches!(task.initialize(), Err(TaskError::Validation(_))));
}

#[tokio::test]
async fn initialize_twice_is_an_invalid_transition() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(TaskDefinitionBuilder::new("print(1)"), &executor);

    task.initialize()?;
    let err = task.initialize().unwrap_err();
    assert!(
        matches!(
            err,
            TaskError::InvalidTransition {
                from: TaskState::Initialized,
                to: TaskState::Initialized
            }
        ),
        "got {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn run_without_initialize_does_not_execute() {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(TaskDefinitionBuilder::new("print(1)"), &executor);

    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Failed);
    assert_eq!(result.exit_code, EXIT_CODE_FAILURE);
    assert_eq!(task.state(), TaskState::Created);
    assert!(!task.state().is_terminal());
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn second_run_returns_the_stored_result() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(2));
    let task = python_task(TaskDefinitionBuilder::new("print(1)"), &executor);

    task.initialize()?;
    let first = task.run().await;
    let second = task.run().await;

    assert_eq!(first, second);
    assert_eq!(task.result(), Some(first));
    assert_eq!(executor.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn template_line_endings_are_normalised() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(
        TaskDefinitionBuilder::new("print(1)\r\nprint('${x}')\r\n").local("x", "two"),
        &executor,
    );

    task.initialize()?;
    let params = task.parameters().expect("initialized");
    assert_eq!(params.raw_script(), "print(1)\nprint('${x}')\n");

    task.run().await;
    assert_eq!(executor.requests()[0].payload, "print(1)\nprint('two')\n");
    Ok(())
}

#[tokio::test]
async fn blank_resolved_payload_fails_without_spawning() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let task = python_task(
        TaskDefinitionBuilder::new("${body}").local("body", ""),
        &executor,
    );

    task.initialize()?;
    let result = task.run().await;

    assert_eq!(result.state, TerminalState::Failed);
    assert_eq!(result.exit_code, EXIT_CODE_FAILURE);
    assert!(executor.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn status_updates_and_output_reach_the_sinks() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::Exit {
        lines: vec!["line one".to_string(), "line two".to_string()],
        code: 0,
    });
    let (deps, logs, statuses) = recording_deps(Arc::new(executor.clone()));
    let task = PythonTask::new(
        TaskDefinitionBuilder::new("print(1)").build(),
        deps,
        "python3",
    );

    task.initialize()?;
    task.run().await;

    assert_eq!(logs.lines(), vec!["line one", "line two"]);

    let updates = statuses.updates();
    let states: Vec<TaskState> = updates.iter().map(|u| u.state).collect();
    assert_eq!(states, vec![TaskState::Running, TaskState::Succeeded]);
    assert_eq!(updates[0].exit_code, None);
    assert_eq!(updates[1].exit_code, Some(0));
    assert_eq!(updates[1].instance_id, 1);
    Ok(())
}

#[tokio::test]
async fn shell_task_uses_its_own_interpreter() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let (deps, _logs, _statuses) = recording_deps(Arc::new(executor.clone()));
    let task = ShellTask::new(
        TaskDefinitionBuilder::new("echo ${x}")
            .kind(TaskKind::Shell)
            .local("x", "1")
            .build(),
        deps,
        "bash",
    );

    task.initialize()?;
    task.run().await;

    let request = &executor.requests()[0];
    assert_eq!(request.kind, TaskKind::Shell);
    assert_eq!(request.interpreter, "bash");
    assert_eq!(request.file_extension, "sh");
    assert_eq!(request.payload, "echo 1");
    Ok(())
}

#[tokio::test]
async fn factory_picks_the_task_kind() -> TestResult {
    init_tracing();

    let executor = FakeExecutor::new(FakeBehaviour::exit(0));
    let (deps, _logs, _statuses) = recording_deps(Arc::new(executor.clone()));
    let factory = TaskFactory::new(
        deps.executor,
        deps.status_sink,
        InterpreterSection::default(),
    )
    .with_log_sink(deps.log_sink);

    let python = factory.create(TaskDefinitionBuilder::new("print(1)").build());
    let shell = factory.create(
        TaskDefinitionBuilder::new("echo 1")
            .kind(TaskKind::Shell)
            .build(),
    );

    assert_eq!(python.kind(), TaskKind::Python);
    assert_eq!(shell.kind(), TaskKind::Shell);

    python.initialize()?;
    shell.initialize()?;
    python.run().await;
    shell.run().await;

    let interpreters: Vec<String> = executor
        .requests()
        .into_iter()
        .map(|r| r.interpreter)
        .collect();
    assert_eq!(interpreters, vec!["python3", "sh"]);
    Ok(())
}
