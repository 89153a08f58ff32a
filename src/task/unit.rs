// src/task/unit.rs

//! The task execution unit: lifecycle state machine shared by all task kinds.
//!
//! One `ExecutionUnit` serves exactly one execution attempt:
//!
//! 1. `initialize` validates the task parameters (`Created -> Initialized`).
//! 2. `run` resolves parameters into the payload, hands it to the executor
//!    together with the cancellation token, and maps the outcome to a
//!    terminal state (`Initialized -> Running -> terminal`).
//! 3. `cancel` may be called from any other task at any time; it only sets
//!    the token. `run` checks it before resolving anything, and the executor
//!    observes it before spawning and while supervising the process.
//!
//! The lifecycle mutex is never held across an `.await`; the token is the
//! only state shared with a concurrent `cancel`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, TaskError};
use crate::exec::backend::{
    EXIT_CODE_KILL, ExecOutcome, ExecRequest, Executor, KillReason, ScriptSpec,
};
use crate::exec::sink::{LogSink, StatusSink, StatusUpdate};
use crate::params::{ScheduleContext, merge, substitute};
use crate::task::definition::{TaskDefinition, TaskParameters};
use crate::task::state::{ExecutionResult, TaskState, TerminalState};
use crate::types::TaskKind;

/// Collaborators supplied to every task at construction.
#[derive(Clone)]
pub struct TaskDeps {
    pub executor: Arc<dyn Executor>,
    pub log_sink: Arc<dyn LogSink>,
    pub status_sink: Arc<dyn StatusSink>,
}

#[derive(Debug)]
struct Lifecycle {
    state: TaskState,
    parameters: Option<TaskParameters>,
    result: Option<ExecutionResult>,
}

pub struct ExecutionUnit {
    kind: TaskKind,
    definition: TaskDefinition,
    script: ScriptSpec,
    deps: TaskDeps,
    cancel: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl ExecutionUnit {
    pub fn new(kind: TaskKind, definition: TaskDefinition, script: ScriptSpec, deps: TaskDeps) -> Self {
        Self {
            kind,
            definition,
            script,
            deps,
            cancel: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: TaskState::Created,
                parameters: None,
                result: None,
            }),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn state(&self) -> TaskState {
        self.lock().state
    }

    pub fn result(&self) -> Option<ExecutionResult> {
        self.lock().result.clone()
    }

    /// Validated, newline-normalised parameters (after `initialize`).
    pub fn parameters(&self) -> Option<TaskParameters> {
        self.lock().parameters.clone()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Validate the definition and move to `Initialized`.
    ///
    /// On failure the unit stays in `Created`; a later `run` will not spawn
    /// anything.
    pub fn initialize(&self) -> Result<()> {
        let mut lifecycle = self.lock();
        if lifecycle.state != TaskState::Created {
            return Err(TaskError::InvalidTransition {
                from: lifecycle.state,
                to: TaskState::Initialized,
            });
        }

        info!(
            app_id = %self.definition.context.app_id,
            kind = %self.kind,
            params = ?self.definition.parameters,
            "task params"
        );

        if self.definition.kind != self.kind {
            return Err(TaskError::Validation(format!(
                "definition is a {} task but was given to a {} task",
                self.definition.kind, self.kind
            )));
        }

        let parameters = self.definition.parameters.normalized();
        if let Err(err) = parameters.check() {
            warn!(
                app_id = %self.definition.context.app_id,
                error = %err,
                "task params are not valid"
            );
            return Err(err);
        }

        lifecycle.parameters = Some(parameters);
        lifecycle.state = TaskState::Initialized;
        Ok(())
    }

    /// Execute the attempt and return its terminal result.
    ///
    /// Never fails: every error is folded into the returned result.
    pub async fn run(&self) -> ExecutionResult {
        let parameters = match self.begin_run() {
            Ok(parameters) => parameters,
            Err(result) => return result,
        };

        self.report(TaskState::Running, None);
        let result = self.execute(&parameters).await;
        self.finish(result)
    }

    /// Request cancellation. Only the first call has an effect.
    pub fn cancel(&self) {
        if self.is_cancel_requested() {
            debug!(
                app_id = %self.definition.context.app_id,
                "cancellation already requested; ignoring"
            );
            return;
        }

        self.cancel.cancel();
        info!(
            app_id = %self.definition.context.app_id,
            state = ?self.state(),
            "cancellation requested"
        );
    }

    fn begin_run(&self) -> std::result::Result<TaskParameters, ExecutionResult> {
        let mut lifecycle = self.lock();

        let stored = lifecycle.result.as_ref().filter(|_| lifecycle.state.is_terminal());
        if let Some(result) = stored {
            debug!(
                app_id = %self.definition.context.app_id,
                "run called after the attempt finished; returning stored result"
            );
            return Err(result.clone());
        }

        if !lifecycle.state.can_transition_to(TaskState::Running) {
            let message = format!("run is not valid in state {:?}", lifecycle.state);
            warn!(app_id = %self.definition.context.app_id, "{}", message);
            return Err(ExecutionResult::internal_failure(message));
        }

        let Some(parameters) = lifecycle.parameters.clone() else {
            return Err(ExecutionResult::internal_failure(
                "task was initialized without parameters",
            ));
        };

        lifecycle.state = TaskState::Running;
        Ok(parameters)
    }

    async fn execute(&self, parameters: &TaskParameters) -> ExecutionResult {
        let context = &self.definition.context;

        if self.is_cancel_requested() {
            info!(
                app_id = %context.app_id,
                "cancellation requested before run; not executing"
            );
            return ExecutionResult::cancelled();
        }

        info!(app_id = %context.app_id, "raw script : {}", parameters.raw_script());
        info!(app_id = %context.app_id, "task dir : {}", context.working_dir.display());

        let payload = match resolve_payload(&self.definition, parameters) {
            Ok(payload) => payload,
            Err(err) => return self.failure(err),
        };
        info!(app_id = %context.app_id, "resolved payload : {}", payload);

        let request = ExecRequest::new(payload, self.kind, &self.script, context);
        let outcome = self
            .deps
            .executor
            .execute(request, self.cancel.clone(), Arc::clone(&self.deps.log_sink))
            .await;

        match outcome {
            Ok(outcome) => self.map_outcome(outcome),
            Err(err) => self.failure(err),
        }
    }

    /// An internal error ends the attempt as `Failed`/-1, unless cancellation
    /// was requested meanwhile.
    fn failure(&self, err: TaskError) -> ExecutionResult {
        let app_id = &self.definition.context.app_id;
        if self.is_cancel_requested() {
            info!(app_id = %app_id, error = %err, "task error after cancellation; reporting cancelled");
            return ExecutionResult::cancelled();
        }
        error!(app_id = %app_id, error = %err, "task failure");
        ExecutionResult::internal_failure(err.to_string())
    }

    fn map_outcome(&self, outcome: ExecOutcome) -> ExecutionResult {
        let cancelled = self.is_cancel_requested();
        match outcome {
            ExecOutcome::Killed(KillReason::Cancelled) => ExecutionResult::cancelled(),
            ExecOutcome::Killed(KillReason::TimedOut) if cancelled => ExecutionResult::cancelled(),
            ExecOutcome::Killed(KillReason::TimedOut) => {
                warn!(
                    app_id = %self.definition.context.app_id,
                    timeout = ?self.definition.context.timeout(),
                    "task process killed after timeout"
                );
                ExecutionResult::from_exit_code(EXIT_CODE_KILL)
            }
            ExecOutcome::Exited(code) if cancelled && code != 0 => ExecutionResult {
                exit_code: code,
                state: TerminalState::Cancelled,
                cause: None,
            },
            ExecOutcome::Exited(code) => ExecutionResult::from_exit_code(code),
        }
    }

    fn finish(&self, result: ExecutionResult) -> ExecutionResult {
        let state = TaskState::from(result.state);
        {
            let mut lifecycle = self.lock();
            lifecycle.state = state;
            lifecycle.result = Some(result.clone());
        }

        info!(
            app_id = %self.definition.context.app_id,
            instance_id = self.definition.context.instance_id,
            state = ?state,
            exit_code = result.exit_code,
            "task attempt finished"
        );
        self.report(state, Some(result.exit_code));
        result
    }

    fn report(&self, state: TaskState, exit_code: Option<i32>) {
        self.deps.status_sink.report(&StatusUpdate {
            app_id: self.definition.context.app_id.clone(),
            instance_id: self.definition.context.instance_id,
            state,
            exit_code,
        });
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Merge all parameter sources for `definition` and substitute them into the
/// payload template of `parameters`.
///
/// Fails if the resolved payload is blank.
pub fn resolve_payload(definition: &TaskDefinition, parameters: &TaskParameters) -> Result<String> {
    let schedule = ScheduleContext::from_execution(&definition.context, &definition.defined_params);
    let params = merge(&definition.global_params, &parameters.local_params, &schedule);
    let payload = substitute(parameters.raw_script(), &params);

    if payload.trim().is_empty() {
        return Err(TaskError::Execution(
            "resolved payload is empty".to_string(),
        ));
    }
    Ok(payload)
}
