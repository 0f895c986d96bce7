//! Spawning the navigator under a deadline.

use crate::command::NavigatorCommand;
use crate::runner::error::{ErrorCode, RunError, RunResult};
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Time allowed for the output readers to drain after the process is gone.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// When to give up on a run and how hard to stop it.
#[derive(Clone, Debug)]
pub struct Deadline {
    pub timeout: Duration,
    /// Wait between SIGTERM and SIGKILL.
    pub grace: Duration,
    pub cancel: CancellationToken,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Captured stdout followed by captured stderr.
    pub output: String,
    pub deadline_exceeded: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
}

enum Stop {
    Exited(std::io::Result<ExitStatus>),
    DeadlineExceeded,
    Cancelled,
}

pub async fn execute(
    command: &NavigatorCommand,
    deadline: &Deadline,
) -> RunResult<ExecutionOutput> {
    let started = Instant::now();
    let mut process = Command::new(&command.program);
    process
        .args(&command.args)
        .envs(&command.env)
        .current_dir(&command.working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    process.process_group(0);

    let mut child = process.spawn().map_err(|err| {
        RunError::new(
            ErrorCode::Spawn,
            "failed to start navigator",
            Some(serde_json::json!({
                "program": command.program,
                "source": err.to_string(),
            })),
        )
    })?;
    info!(program = %command.program, pid = ?child.id(), "navigator started");

    let stdout = tokio::spawn(read_stream(child.stdout.take()));
    let stderr = tokio::spawn(read_stream(child.stderr.take()));

    let stop = tokio::select! {
        status = child.wait() => Stop::Exited(status),
        () = tokio::time::sleep(deadline.timeout) => Stop::DeadlineExceeded,
        () = deadline.cancel.cancelled() => Stop::Cancelled,
    };

    let (status, deadline_exceeded, cancelled) = match stop {
        Stop::Exited(status) => (
            status.map_err(|err| {
                RunError::io(ErrorCode::Execution, "failed to wait for navigator", err)
            })?,
            false,
            false,
        ),
        Stop::DeadlineExceeded => {
            warn!(timeout_secs = deadline.timeout.as_secs(), "navigator exceeded its deadline");
            (terminate(&mut child, deadline.grace).await?, true, false)
        }
        Stop::Cancelled => {
            warn!("navigator run cancelled");
            (terminate(&mut child, deadline.grace).await?, false, true)
        }
    };

    let mut output = drain(stdout).await;
    output.push_str(&drain(stderr).await);

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        exit_code = ?status.code(),
        success = status.success(),
        deadline_exceeded,
        cancelled,
        duration_ms,
        "navigator finished"
    );

    Ok(ExecutionOutput {
        exit_code: status.code(),
        success: status.success() && !deadline_exceeded && !cancelled,
        output,
        deadline_exceeded,
        cancelled,
        duration_ms,
    })
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(err) = stream.read_to_end(&mut buf).await {
            debug!(error = %err, "navigator output stream closed with error");
        }
    }
    buf
}

async fn drain(reader: tokio::task::JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(DRAIN_TIMEOUT, reader).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(err)) => {
            debug!(error = %err, "output reader failed");
            String::new()
        }
        Err(_) => {
            debug!("output reader did not finish");
            String::new()
        }
    }
}

/// SIGTERM the process group, then SIGKILL it once `grace` has elapsed.
async fn terminate(child: &mut Child, grace: Duration) -> RunResult<ExitStatus> {
    #[cfg(unix)]
    if let Some(pgid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        let pgid = Pid::from_raw(pgid);
        signal_process_group(pgid, Signal::SIGTERM)?;
        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            return status.map_err(|err| {
                RunError::io(ErrorCode::Execution, "failed to wait for navigator", err)
            });
        }
        signal_process_group(pgid, Signal::SIGKILL)?;
    }

    child
        .kill()
        .await
        .map_err(|err| RunError::io(ErrorCode::Execution, "failed to kill navigator", err))?;
    child
        .wait()
        .await
        .map_err(|err| RunError::io(ErrorCode::Execution, "failed to wait for navigator", err))
}

#[cfg(unix)]
fn signal_process_group(pgid: Pid, signal: Signal) -> RunResult<()> {
    match killpg(pgid, signal) {
        // ESRCH: the group already exited.
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(err) => Err(RunError::io(
            ErrorCode::Execution,
            "failed to signal navigator process group",
            err,
        )),
    }
}
