// src/retry.rs

//! Fixed-delay retry around the execution gateway.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::exit_codes;
use crate::exec::{OutputMode, execute};
use crate::invocation::Invocation;

/// Run `invocation` up to `max_attempts` times, sleeping `delay` between
/// attempts, and return the terminal exit status.
///
/// - The first attempt that exits 0 returns immediately; no further
///   attempts and no further delay.
/// - The delay applies only *between* attempts, never after the last one.
///   A zero delay is legal and means immediate retry.
/// - `max_attempts == 0` is clamped to 1 (logged, not silently ignored).
/// - A spawn failure is not retried: it counts as the failing attempt and
///   maps to [`exit_codes::SPAWN_FAILED`].
///
/// Never fails: after exhaustion, the status of the *last* attempt is
/// returned as-is.
pub async fn retry(invocation: &Invocation, max_attempts: u32, delay: Duration) -> i32 {
    if max_attempts == 0 {
        warn!(cmd = %invocation, "retry called with max_attempts = 0; clamping to 1");
    }
    let attempts = max_attempts.max(1);

    let mut last_status = exit_codes::SPAWN_FAILED;
    for attempt in 1..=attempts {
        let status = match execute(invocation, OutputMode::Passthrough).await {
            Ok(output) => output.status,
            Err(err) => {
                warn!(
                    cmd = %invocation,
                    attempt,
                    error = %err,
                    "attempt could not be spawned; not retrying"
                );
                return err.as_exit_code();
            }
        };

        if status == exit_codes::SUCCESS {
            debug!(cmd = %invocation, attempt, "attempt succeeded");
            return exit_codes::SUCCESS;
        }

        last_status = status;
        if attempt < attempts {
            warn!(
                cmd = %invocation,
                attempt,
                exit_code = status,
                delay_ms = delay.as_millis() as u64,
                "attempt failed; retrying after delay"
            );
            sleep(delay).await;
        }
    }

    warn!(
        cmd = %invocation,
        attempts,
        exit_code = last_status,
        "all attempts exhausted"
    );
    last_status
}
