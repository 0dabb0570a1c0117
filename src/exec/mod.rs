// src/exec/mod.rs

//! Process execution layer.
//!
//! This module owns everything that touches a child process directly:
//!
//! - [`handle`] wraps one spawned `tokio::process::Child` behind
//!   [`ProcessHandle`]: wait-for-completion, forced process-group
//!   termination, and captured-output retrieval.
//! - [`gateway`] is the single entry point the rest of the crate (and
//!   callers) use to run a command to completion with consistent logging
//!   and verbatim exit-status propagation.

pub mod gateway;
pub mod handle;

pub use gateway::{ExecOutput, execute};
pub use handle::{OutputMode, ProcessHandle};
