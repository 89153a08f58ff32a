use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use taskunit::errors::TaskError;
use taskunit::exec::{ExecFuture, ExecOutcome, ExecRequest, Executor, KillReason, LogSink};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// What the fake "process" does once spawned.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Emit the given lines, then exit with the code.
    Exit { lines: Vec<String>, code: i32 },
    /// Fail inside the executor (e.g. could not spawn).
    Fault(String),
    /// Block until the token is cancelled, then report a kill.
    WaitForCancel,
    /// Report that the timeout expired.
    TimeOut,
}

impl FakeBehaviour {
    pub fn exit(code: i32) -> Self {
        FakeBehaviour::Exit {
            lines: vec![],
            code,
        }
    }
}

/// A fake executor that:
/// - records every request it receives
/// - honours a pre-set cancellation token without "spawning"
/// - otherwise counts a spawn and follows its scripted behaviour.
///
/// Clones share their recorded state.
#[derive(Clone)]
pub struct FakeExecutor {
    behaviour: FakeBehaviour,
    requests: Arc<Mutex<Vec<ExecRequest>>>,
    spawned: Arc<AtomicUsize>,
    started: Arc<Notify>,
}

impl FakeExecutor {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            requests: Arc::new(Mutex::new(Vec::new())),
            spawned: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(Notify::new()),
        }
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of fake processes that were "spawned".
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Resolves once a fake process has been spawned.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

impl Executor for FakeExecutor {
    fn execute(
        &self,
        request: ExecRequest,
        cancel: CancellationToken,
        log: Arc<dyn LogSink>,
    ) -> ExecFuture<'_> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);

            if cancel.is_cancelled() {
                return Ok(ExecOutcome::Killed(KillReason::Cancelled));
            }

            self.spawned.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();

            match &self.behaviour {
                FakeBehaviour::Exit { lines, code } => {
                    for line in lines {
                        log.log_line(line);
                    }
                    Ok(ExecOutcome::Exited(*code))
                }
                FakeBehaviour::Fault(message) => Err(TaskError::Execution(message.clone())),
                FakeBehaviour::WaitForCancel => {
                    cancel.cancelled().await;
                    Ok(ExecOutcome::Killed(KillReason::Cancelled))
                }
                FakeBehaviour::TimeOut => Ok(ExecOutcome::Killed(KillReason::TimedOut)),
            }
        })
    }
}
