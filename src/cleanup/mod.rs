// src/cleanup/mod.rs

//! Process-wide, signal-aware resource teardown.
//!
//! [`CleanupRegistry`] holds an ordered stack of teardown actions and two
//! sets of ephemeral paths (files, directories). Teardown runs exactly
//! once, in reverse-registration order, whichever exit path fires first:
//! SIGINT, SIGTERM, or the scope guard held at the program's entry point.
//! Exactly those three triggers are handled (no other signals are
//! intercepted), and the registry never changes the protected program's
//! exit status.
//!
//! The process-wide instance is created explicitly through [`init`], not
//! implicitly on first use, so its lifetime stays auditable:
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() {
//!     let _cleanup = runcore::cleanup::guard();
//!
//!     let registry = runcore::cleanup::init();
//!     registry.register_temp_file("/tmp/scratch.dat");
//!     // ... run commands ...
//! } // guard drops here; teardown runs once
//! ```

pub mod registry;

pub use registry::{CleanupAction, CleanupRegistry, Lifecycle};

use std::sync::OnceLock;

static REGISTRY: OnceLock<CleanupRegistry> = OnceLock::new();

/// Initialise the process-wide registry (idempotent) and install its
/// signal-driven teardown triggers.
pub fn init() -> &'static CleanupRegistry {
    let registry = REGISTRY.get_or_init(CleanupRegistry::new);
    registry.install();
    registry
}

/// The process-wide registry, if [`init`] has been called.
pub fn get() -> Option<&'static CleanupRegistry> {
    REGISTRY.get()
}

/// Explicit shutdown: run teardown on the process-wide registry now.
///
/// A no-op when [`init`] was never called or teardown already ran.
pub fn shutdown() {
    if let Some(registry) = REGISTRY.get() {
        registry.teardown();
    }
}

/// Scope guard for the normal-exit teardown trigger.
///
/// Hold one across `main`'s body. Signals are handled by the listeners
/// [`init`] installs; the guard is the second line of defense covering
/// plain returns and `?`-propagated errors out of `main`.
#[must_use = "the guard only triggers teardown when dropped"]
pub struct TeardownGuard(());

/// Initialise the registry and return the guard for `main`'s scope.
pub fn guard() -> TeardownGuard {
    init();
    TeardownGuard(())
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        shutdown();
    }
}
