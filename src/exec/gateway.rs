// src/exec/gateway.rs

use tracing::info;

use crate::errors::{ExecError, exit_codes};
use crate::exec::handle::{OutputMode, ProcessHandle};
use crate::invocation::Invocation;

/// Outcome of one gateway execution.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit status, propagated verbatim from the child.
    pub status: i32,
    /// Captured stdout in [`OutputMode::Capture`]; `None` in passthrough.
    pub stdout: Option<String>,
}

impl ExecOutput {
    /// True iff the child exited 0.
    pub fn success(&self) -> bool {
        self.status == exit_codes::SUCCESS
    }
}

/// Run one command to completion.
///
/// Spawns exactly one child with the invocation's argv and environment
/// overlay, waits for it to exit, and returns its status unchanged: the
/// gateway never translates or remaps a child's exit code. `mode` only
/// selects whether stdout is passed through live or captured into
/// [`ExecOutput::stdout`].
///
/// Start and end events go to the `tracing` channel, separate from the
/// child's own streams. An empty invocation fails with
/// [`ExecError::EmptyInvocation`] and creates no process.
pub async fn execute(invocation: &Invocation, mode: OutputMode) -> Result<ExecOutput, ExecError> {
    let handle = ProcessHandle::spawn(invocation, mode)?;
    info!(cmd = %invocation, pid = ?handle.id(), "starting command");

    let output = match mode {
        OutputMode::Capture => {
            let (status, stdout) = handle.wait_with_output().await?;
            ExecOutput {
                status,
                stdout: Some(stdout),
            }
        }
        OutputMode::Passthrough => {
            let mut handle = handle;
            let status = handle.wait().await?;
            ExecOutput {
                status,
                stdout: None,
            }
        }
    };

    info!(
        cmd = %invocation,
        exit_code = output.status,
        success = output.success(),
        "command exited"
    );
    Ok(output)
}
