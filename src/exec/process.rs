// src/exec/process.rs

//! Child process handling shared by the providers.

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::exec::context::{BoxFuture, ContextError, ExecutionRun, RunResult, StdinStream};

/// Exit code as a shell reports it: a child killed by signal `n` exits
/// with `128 + n`.
fn exit_code_of(label: &str, status: ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            warn!(process = %label, signal, "process killed by signal");
            return Some(128 + signal);
        }
    }
    None
}

async fn read_all<R>(mut reader: R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// A spawned child whose stdout and stderr are drained in the background.
///
/// Draining starts right at spawn time, so a child that writes a lot while
/// still reading stdin cannot block on a full pipe.
pub struct ProcessRun {
    label: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: JoinHandle<std::io::Result<Vec<u8>>>,
    stderr: JoinHandle<std::io::Result<Vec<u8>>>,
}

impl ProcessRun {
    pub fn spawn(label: impl Into<String>, mut cmd: Command) -> Result<Self, ContextError> {
        let label = label.into();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        debug!(process = %label, pid = ?child.id(), "process started");

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ContextError::Command(format!("{label}: stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ContextError::Command(format!("{label}: stderr not captured")))?;

        Ok(Self {
            label,
            child,
            stdin,
            stdout: tokio::spawn(read_all(stdout)),
            stderr: tokio::spawn(read_all(stderr)),
        })
    }
}

async fn join_reader(
    label: &str,
    stream: &str,
    handle: JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ContextError> {
    match handle.await {
        Ok(read) => Ok(read?),
        Err(err) => Err(ContextError::Interrupted(format!(
            "{label}: {stream} reader stopped: {err}"
        ))),
    }
}

impl ExecutionRun for ProcessRun {
    fn take_stdin(&mut self) -> Option<StdinStream> {
        self.stdin.take().map(|s| Box::new(s) as StdinStream)
    }

    fn wait_for_completion(self: Box<Self>) -> BoxFuture<'static, Result<RunResult, ContextError>> {
        Box::pin(async move {
            let ProcessRun {
                label,
                mut child,
                stdin,
                stdout,
                stderr,
            } = *self;

            // EOF for children that still wait on stdin.
            drop(stdin);

            let status = child.wait().await?;
            let stdout = join_reader(&label, "stdout", stdout).await?;
            let stderr = join_reader(&label, "stderr", stderr).await?;

            let Some(exit_code) = exit_code_of(&label, status) else {
                return Err(ContextError::Interrupted(format!(
                    "{label}: process ended without an exit status"
                )));
            };

            debug!(process = %label, exit_code, "process exited");
            Ok(RunResult {
                exit_code,
                stdout,
                stderr,
            })
        })
    }
}
