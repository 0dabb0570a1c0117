// src/deadline.rs

//! Deadline enforcement for a single child process.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::{ExecError, exit_codes};
use crate::exec::{OutputMode, ProcessHandle};
use crate::invocation::Invocation;

/// Race `invocation` against a deadline of `limit`.
///
/// Exactly two competitors: the child process and a timer. If the child
/// exits first, the timer is dropped and the child's real exit status is
/// returned. If the timer fires first, the child's whole process group is
/// forcibly terminated and reaped, and [`exit_codes::TIMED_OUT`] is
/// returned. Either way, no child process survives this call.
pub async fn run_with_timeout(invocation: &Invocation, limit: Duration) -> Result<i32, ExecError> {
    let mut handle = ProcessHandle::spawn(invocation, OutputMode::Passthrough)?;
    debug!(cmd = %invocation, limit_ms = limit.as_millis() as u64, "deadline guard armed");

    tokio::select! {
        status = handle.wait() => {
            let status = status?;
            debug!(cmd = %invocation, exit_code = status, "command beat the deadline");
            Ok(status)
        }
        _ = sleep(limit) => {
            warn!(
                cmd = %invocation,
                limit_ms = limit.as_millis() as u64,
                "deadline exceeded; terminating process group"
            );
            handle.terminate().await;
            // Reap so no zombie is left behind; the post-kill status is
            // discarded in favour of the distinguished timeout value.
            let _ = handle.wait().await;
            Ok(exit_codes::TIMED_OUT)
        }
    }
}
