//! Subject execution
//!
//! Runs a subject binary against one fixture under a wall-clock budget. The
//! call blocks the driver; internally a current-thread tokio runtime supervises
//! the child so stdout and stderr can be drained while waiting on the timeout.
//!
//! Nothing in here returns an error: spawn failures and timeouts are folded
//! into [`ExecutionOutcome`] so one bad fixture cannot stop the run.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::error::HarnessError;

/// How long output readers may keep draining after a timed-out child is killed.
///
/// Grandchildren that inherited the pipes can keep them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How a subject invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// Process exited with a code
    Exited(i32),
    /// Process was terminated by a signal
    Signaled,
    /// Budget exceeded; the process was killed
    TimedOut(Duration),
    /// Process could not be started (or waited on)
    SpawnFailed(String),
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "{}", code),
            ExitStatus::Signaled => write!(f, "terminated by signal"),
            ExitStatus::TimedOut(budget) => write!(f, "timed out after {} seconds", budget.as_secs_f64()),
            ExitStatus::SpawnFailed(message) => write!(f, "failed to start: {}", message),
        }
    }
}

/// Captured result of one subject invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl ExecutionOutcome {
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            status: ExitStatus::SpawnFailed(message.into()),
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.status, ExitStatus::TimedOut(_))
    }

    /// Timeouts and spawn failures as harness errors.
    pub fn error(&self, binary: &Path) -> Option<HarnessError> {
        match &self.status {
            ExitStatus::TimedOut(budget) => Some(HarnessError::ExecutionTimeout(*budget)),
            ExitStatus::SpawnFailed(message) => Some(HarnessError::ExecutionSpawnFailure {
                binary: binary.to_path_buf(),
                message: message.clone(),
            }),
            ExitStatus::Exited(_) | ExitStatus::Signaled => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ExitStatus::Exited(code) => Some(code),
            _ => None,
        }
    }
}

/// Run `binary <fixture>` in `working_dir`, killing it after `timeout`.
#[tracing::instrument(skip_all, fields(fixture = %fixture.display()))]
pub fn execute(binary: &Path, fixture: &Path, working_dir: &Path, timeout: Duration) -> ExecutionOutcome {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return ExecutionOutcome::spawn_failed(format!("cannot start process supervisor: {}", e)),
    };
    runtime.block_on(supervise(binary, fixture, working_dir, timeout))
}

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

async fn supervise(binary: &Path, fixture: &Path, working_dir: &Path, timeout: Duration) -> ExecutionOutcome {
    let spawned = Command::new(binary)
        .arg(fixture)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => return ExecutionOutcome::spawn_failed(format!("{}: {}", binary.display(), e)),
    };

    let stdout_buf = SharedBuffer::default();
    let stderr_buf = SharedBuffer::default();
    let mut readers = Vec::with_capacity(2);
    if let Some(pipe) = child.stdout.take() {
        readers.push(drain(pipe, Arc::clone(&stdout_buf)));
    }
    if let Some(pipe) = child.stderr.take() {
        readers.push(drain(pipe, Arc::clone(&stderr_buf)));
    }

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => match status.code() {
            Some(code) => ExitStatus::Exited(code),
            None => ExitStatus::Signaled,
        },
        Ok(Err(e)) => ExitStatus::SpawnFailed(format!("failed to wait on {}: {}", binary.display(), e)),
        Err(_) => {
            tracing::debug!("budget of {:?} exceeded, killing subject", timeout);
            if let Err(e) = child.kill().await {
                tracing::warn!("failed to kill timed out subject: {}", e);
            }
            ExitStatus::TimedOut(timeout)
        }
    };

    let grace = if matches!(status, ExitStatus::TimedOut(_)) {
        DRAIN_GRACE
    } else {
        // A finished child closes its pipes; only stray descendants keep them open.
        DRAIN_GRACE * 4
    };
    for reader in readers {
        finish_reader(reader, grace).await;
    }

    ExecutionOutcome {
        stdout: take_text(&stdout_buf),
        stderr: take_text(&stderr_buf),
        status,
    }
}

fn drain<R>(mut pipe: R, buffer: SharedBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => match buffer.lock() {
                    Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                    Err(_) => break,
                },
                Err(e) => {
                    tracing::debug!("output pipe closed with error: {}", e);
                    break;
                }
            }
        }
    })
}

async fn finish_reader(reader: JoinHandle<()>, grace: Duration) {
    let abort = reader.abort_handle();
    if tokio::time::timeout(grace, reader).await.is_err() {
        abort.abort();
    }
}

/// Lossy decoding: invalid UTF-8 becomes U+FFFD.
fn take_text(buffer: &SharedBuffer) -> String {
    match buffer.lock() {
        Ok(mut bytes) => String::from_utf8_lossy(&std::mem::take(&mut *bytes)).into_owned(),
        Err(_) => String::new(),
    }
}
