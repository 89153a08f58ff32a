// src/exec/process.rs

//! Production executor that runs payloads as OS processes.
//!
//! For each request it writes two files into the working directory:
//!
//! - `<app_id>_node.<ext>`: the resolved payload;
//! - `<app_id>.command`: a small `sh` wrapper that changes into the working
//!   directory, sources the environment file (if any) and `exec`s the
//!   interpreter on the payload file.
//!
//! The wrapper is run with `sh` (or `sudo -u <tenant> -E sh` when
//! `run_as_tenant` is enabled) in its own process group. Cancellation and
//! timeout share one termination path, which kills that group.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExecutorSection;
use crate::errors::Result;
use crate::exec::backend::{
    EXIT_CODE_FAILURE, ExecFuture, ExecOutcome, ExecRequest, Executor, KillReason,
};
use crate::exec::sink::LogSink;

/// Options for [`ProcessExecutor`].
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Run the wrapper as the request's tenant via `sudo -u`.
    pub run_as_tenant: bool,
    /// How long to wait for output readers after the process is gone.
    pub output_drain: Duration,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            run_as_tenant: false,
            output_drain: Duration::from_millis(1000),
        }
    }
}

impl From<&ExecutorSection> for ProcessOptions {
    fn from(section: &ExecutorSection) -> Self {
        Self {
            run_as_tenant: section.run_as_tenant,
            output_drain: Duration::from_millis(section.output_drain_ms),
        }
    }
}

/// Executor backed by `tokio::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    options: ProcessOptions,
}

impl ProcessExecutor {
    pub fn new(options: ProcessOptions) -> Self {
        Self { options }
    }

    async fn execute_inner(
        &self,
        request: ExecRequest,
        cancel: CancellationToken,
        log: Arc<dyn LogSink>,
    ) -> Result<ExecOutcome> {
        if cancel.is_cancelled() {
            info!(
                app_id = %request.app_id,
                "cancellation requested before spawn; not starting process"
            );
            return Ok(ExecOutcome::Killed(KillReason::Cancelled));
        }

        let command_file = write_command_files(&request).await?;
        let mut cmd = self.build_command(&request, &command_file);

        // The file writes above are a suspension point; look again.
        if cancel.is_cancelled() {
            info!(
                app_id = %request.app_id,
                "cancellation requested before spawn; not starting process"
            );
            return Ok(ExecOutcome::Killed(KillReason::Cancelled));
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", request.app_id))?;

        info!(
            app_id = %request.app_id,
            instance_id = request.instance_id,
            pid = ?child.id(),
            command_file = %command_file.display(),
            "task process started"
        );

        let readers = spawn_output_readers(&mut child, &log);

        // Exactly one of: the process exits on its own, the token fires, or
        // the timeout expires.
        let outcome = tokio::select! {
            status_res = child.wait() => {
                let status = status_res.with_context(|| {
                    format!("waiting for process of task '{}'", request.app_id)
                })?;
                ExecOutcome::Exited(exit_code_of(status))
            }

            _ = cancel.cancelled() => {
                terminate(&mut child, &request, KillReason::Cancelled).await;
                ExecOutcome::Killed(KillReason::Cancelled)
            }

            _ = expire(request.timeout) => {
                terminate(&mut child, &request, KillReason::TimedOut).await;
                ExecOutcome::Killed(KillReason::TimedOut)
            }
        };

        self.drain(readers, &request).await;

        info!(
            app_id = %request.app_id,
            instance_id = request.instance_id,
            exit_code = outcome.exit_code(),
            outcome = ?outcome,
            "task process finished"
        );

        Ok(outcome)
    }

    fn build_command(&self, request: &ExecRequest, command_file: &Path) -> Command {
        let mut cmd = if self.options.run_as_tenant && !request.tenant.is_empty() {
            let mut c = Command::new("sudo");
            c.arg("-u").arg(&request.tenant).arg("-E").arg("sh").arg(command_file);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg(command_file);
            c
        };

        cmd.current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so `terminate` reaches everything the script
        // started.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    /// Wait (bounded) for the reader tasks so trailing output reaches the sink.
    async fn drain(&self, readers: Vec<JoinHandle<()>>, request: &ExecRequest) {
        for mut handle in readers {
            if tokio::time::timeout(self.options.output_drain, &mut handle)
                .await
                .is_err()
            {
                debug!(
                    app_id = %request.app_id,
                    "output still open after drain timeout; detaching reader"
                );
                handle.abort();
            }
        }
    }
}

impl Executor for ProcessExecutor {
    fn execute(
        &self,
        request: ExecRequest,
        cancel: CancellationToken,
        log: Arc<dyn LogSink>,
    ) -> ExecFuture<'_> {
        Box::pin(self.execute_inner(request, cancel, log))
    }
}

/// Paths of the payload file and its wrapper for a request.
pub fn command_paths(request: &ExecRequest) -> (PathBuf, PathBuf) {
    let script = request.working_dir.join(format!(
        "{}_node.{}",
        request.app_id, request.file_extension
    ));
    let wrapper = request
        .working_dir
        .join(format!("{}.command", request.app_id));
    (script, wrapper)
}

async fn write_command_files(request: &ExecRequest) -> Result<PathBuf> {
    tokio::fs::create_dir_all(&request.working_dir)
        .await
        .with_context(|| format!("creating working dir {:?}", request.working_dir))?;

    let (script_path, command_path) = command_paths(request);

    tokio::fs::write(&script_path, &request.payload)
        .await
        .with_context(|| format!("writing payload file {:?}", script_path))?;

    let wrapper = wrapper_script(request, &script_path);
    tokio::fs::write(&command_path, wrapper)
        .await
        .with_context(|| format!("writing command file {:?}", command_path))?;

    debug!(
        app_id = %request.app_id,
        script = %script_path.display(),
        "wrote payload and command files"
    );

    Ok(command_path)
}

fn wrapper_script(request: &ExecRequest, script_path: &Path) -> String {
    let mut out = String::from("#!/bin/sh\n");
    out.push_str("BASEDIR=$(cd \"$(dirname \"$0\")\"; pwd)\n");
    out.push_str("cd \"$BASEDIR\"\n");

    if let Some(env_file) = &request.env_file {
        let quoted = shell_quote(&env_file.to_string_lossy());
        out.push_str(&format!("if [ -f {quoted} ]; then . {quoted}; fi\n"));
    }

    out.push_str(&format!(
        "exec {} {}\n",
        request.interpreter,
        shell_quote(&script_path.to_string_lossy())
    ));
    out
}

fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

fn spawn_output_readers(child: &mut Child, log: &Arc<dyn LogSink>) -> Vec<JoinHandle<()>> {
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, Arc::clone(log)));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, Arc::clone(log)));
    }
    readers
}

fn forward_lines<R>(stream: R, log: Arc<dyn LogSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                    log.log_line(&String::from_utf8_lossy(raw));
                }
                Err(e) => {
                    warn!(error = %e, "reading task output failed");
                    break;
                }
            }
        }
    })
}

/// Shared termination path for cancellation and timeout.
///
/// Kills the whole process group of the wrapper, then reaps the child.
async fn terminate(child: &mut Child, request: &ExecRequest, reason: KillReason) {
    info!(
        app_id = %request.app_id,
        instance_id = request.instance_id,
        reason = ?reason,
        pid = ?child.id(),
        "killing task process group"
    );

    if !kill_process_group(child) {
        if let Err(e) = child.start_kill() {
            warn!(
                app_id = %request.app_id,
                error = %e,
                "failed to kill task process"
            );
        }
    }

    if let Err(e) = child.wait().await {
        warn!(
            app_id = %request.app_id,
            error = %e,
            "failed to reap task process"
        );
    }
}

/// SIGKILL the child's process group. Returns `false` if that was not
/// possible (already reaped, or not permitted as with a `sudo` leader).
#[cfg(unix)]
fn kill_process_group(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: killpg only sends a signal; the group was created at spawn.
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret != 0 {
        debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "killpg failed; killing direct child only"
        );
    }
    ret == 0
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) -> bool {
    false
}

async fn expire(timeout: Option<Duration>) {
    match timeout {
        Some(after) => tokio::time::sleep(after).await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(EXIT_CODE_FAILURE)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(EXIT_CODE_FAILURE)
}
