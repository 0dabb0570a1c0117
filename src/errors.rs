// src/errors.rs

//! Crate-wide error types and reserved exit-code values.
//!
//! Child exit statuses are propagated verbatim as plain `i32` values so
//! callers can branch on exact codes. `ExecError` only covers the cases
//! where no status exists because the child never ran or could not be
//! awaited.

use std::io;

use thiserror::Error;

/// Reserved exit-code values used across the crate.
///
/// Statuses follow the POSIX convention (0–255, 0 = success). The
/// distinguished values below mirror the GNU `timeout`/shell conventions.
pub mod exit_codes {
    /// Conventional success status.
    pub const SUCCESS: i32 = 0;

    /// Distinguished "deadline exceeded" status; implies the child was
    /// forcibly terminated. Same value GNU `timeout` reports.
    pub const TIMED_OUT: i32 = 124;

    /// Status reported when a program could not be spawned at all.
    pub const SPAWN_FAILED: i32 = 127;
}

/// Errors from the process execution layer.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The invocation had zero tokens; no process was created.
    #[error("empty invocation: no program to run")]
    EmptyInvocation,

    /// The OS refused to spawn the program (typically: not found).
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on an already-spawned child failed.
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// Numeric equivalent for callers that propagate plain exit statuses
    /// instead of errors (e.g. the retry engine).
    pub fn as_exit_code(&self) -> i32 {
        exit_codes::SPAWN_FAILED
    }
}
