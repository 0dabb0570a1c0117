// src/exec/handle.rs

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};
use tracing::{debug, warn};

use crate::errors::ExecError;
use crate::invocation::Invocation;

/// How a child's standard output is wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The child inherits the parent's stdio; output is live.
    Passthrough,
    /// The child's stdout is piped into a private buffer, retrieved via
    /// [`ProcessHandle::wait_with_output`]. Stderr stays live.
    Capture,
}

/// Handle to a single spawned child process.
///
/// On Unix the child is placed in its own process group, so
/// [`terminate`](Self::terminate) can take down the whole subtree without
/// touching the parent.
pub struct ProcessHandle {
    child: Child,
    stdout: Option<ChildStdout>,
    program: String,
}

impl ProcessHandle {
    /// Spawn `invocation` as a child process.
    ///
    /// An empty invocation fails with [`ExecError::EmptyInvocation`]
    /// before any process is created.
    pub fn spawn(invocation: &Invocation, mode: OutputMode) -> Result<Self, ExecError> {
        let program = invocation
            .program()
            .ok_or(ExecError::EmptyInvocation)?
            .to_string();

        let mut cmd = invocation.to_command();
        match mode {
            OutputMode::Passthrough => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::inherit());
            }
        }

        // Own process group, so a group-wide kill cannot hit the parent.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;
        let stdout = child.stdout.take();

        debug!(program = %program, pid = ?child.id(), "spawned child process");
        Ok(Self {
            child,
            stdout,
            program,
        })
    }

    /// OS process id, while the child is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Block until the child exits and return its exit status.
    ///
    /// Signal deaths map to `128 + signo` on Unix, matching the shell
    /// convention.
    pub async fn wait(&mut self) -> Result<i32, ExecError> {
        let status = self.child.wait().await.map_err(|source| ExecError::Wait {
            program: self.program.clone(),
            source,
        })?;
        Ok(exit_code_of(status))
    }

    /// Drain captured stdout to EOF, then reap the child.
    ///
    /// Returns an empty string for children spawned in
    /// [`OutputMode::Passthrough`].
    pub async fn wait_with_output(mut self) -> Result<(i32, String), ExecError> {
        let mut captured = String::new();
        if let Some(mut stdout) = self.stdout.take() {
            // Drain before waiting so a chatty child cannot deadlock on a
            // full pipe.
            if let Err(err) = stdout.read_to_string(&mut captured).await {
                warn!(program = %self.program, error = %err, "failed reading child stdout");
            }
        }
        let status = self.wait().await?;
        Ok((status, captured))
    }

    /// Forcibly terminate the child and everything in its process group:
    /// SIGTERM first, then SIGKILL after a short grace period.
    ///
    /// Does not reap; callers follow up with [`wait`](Self::wait).
    pub async fn terminate(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            // process_group(0) at spawn time makes the child's pgid equal
            // its pid.
            let pgid = Pid::from_raw(pid as i32);
            let _ = killpg(pgid, Signal::SIGTERM);
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = killpg(pgid, Signal::SIGKILL);
            return;
        }

        // Non-Unix, or the child was already reaped: kill the direct
        // child only.
        if let Err(err) = self.child.start_kill() {
            warn!(program = %self.program, error = %err, "failed to kill child process");
        }
    }
}

/// Map an exit status to the POSIX numeric convention: the exit code when
/// there is one, `128 + signal` for signal deaths.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }

    -1
}
