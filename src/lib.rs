// src/lib.rs

//! Process execution and resource-lifecycle core.
//!
//! `runcore` is the layer that higher-level tooling (package-manager
//! wrappers, installers, network probes) calls into whenever it needs to
//! run an external program:
//!
//! - [`execute`] runs one command to completion, optionally capturing its
//!   stdout, and propagates the exit status verbatim.
//! - [`retry`] repeats an invocation up to N times with a fixed delay
//!   between attempts.
//! - [`run_with_timeout`] races a command against a deadline and kills its
//!   whole process group when the timer fires first.
//! - [`run_parallel`] fans a batch of independent commands out as
//!   concurrent child processes and joins all results in submission order.
//! - [`cleanup`] holds the process-wide teardown registry: ordered cleanup
//!   actions plus ephemeral file/dir sets, released exactly once on normal
//!   exit, SIGINT, or SIGTERM.
//!
//! Commands are always described as argv token lists ([`Invocation`]) and
//! spawned through argument-vector APIs; nothing in this crate passes a
//! command line through a shell.

pub mod cleanup;
pub mod deadline;
pub mod errors;
pub mod exec;
pub mod invocation;
pub mod logging;
pub mod parallel;
pub mod retry;

pub use cleanup::{CleanupAction, CleanupRegistry, Lifecycle, TeardownGuard};
pub use deadline::run_with_timeout;
pub use errors::{ExecError, exit_codes};
pub use exec::{ExecOutput, OutputMode, ProcessHandle, execute};
pub use invocation::Invocation;
pub use parallel::{BatchResult, Job, JobResult, run_parallel, run_parallel_bounded};
pub use retry::retry;
