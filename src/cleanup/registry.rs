// src/cleanup/registry.rs

use std::collections::HashSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::errors::ExecError;
use crate::exec::{ExecOutput, OutputMode, execute};
use crate::invocation::Invocation;

/// Registry lifecycle.
///
/// The transition into `TearingDown` is a single compare-and-set, so when
/// several exit paths (normal return, SIGINT, SIGTERM) race, exactly one
/// wins and the others become no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    Uninstalled = 0,
    Installed = 1,
    TearingDown = 2,
    Done = 3,
}

impl Lifecycle {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Lifecycle::Uninstalled,
            1 => Lifecycle::Installed,
            2 => Lifecycle::TearingDown,
            _ => Lifecycle::Done,
        }
    }
}

/// A single teardown obligation, consumed exactly once.
pub enum CleanupAction {
    /// Arbitrary teardown code run in-process.
    Callback(Box<dyn FnOnce() + Send + 'static>),
    /// A command run at teardown. Argv tokens, with the same no-shell rule as
    /// everything else in this crate.
    Command(Invocation),
}

impl fmt::Debug for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupAction::Callback(_) => f.write_str("CleanupAction::Callback(..)"),
            CleanupAction::Command(inv) => write!(f, "CleanupAction::Command({inv})"),
        }
    }
}

#[derive(Default)]
struct Inner {
    actions: Vec<CleanupAction>,
    temp_files: HashSet<PathBuf>,
    temp_dirs: HashSet<PathBuf>,
}

/// Process-wide teardown registry.
///
/// Holds an ordered stack of [`CleanupAction`]s and two sets of ephemeral
/// paths, and guarantees that teardown runs exactly once, in
/// reverse-registration order, whichever exit path fires first. Teardown
/// never substitutes its own outcome for the protected program's exit
/// status: the signal listeners exit with the conventional `128 + signo`
/// *after* cleanup, and the guard/shutdown path leaves the caller's own
/// result untouched.
///
/// Registration methods take `&'static self` because the registry's
/// signal listeners must outlive every borrow; in practice there is one
/// instance per process, owned by [`cleanup::init`](crate::cleanup::init).
pub struct CleanupRegistry {
    state: AtomicU8,
    inner: Mutex<Inner>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(Lifecycle::Uninstalled as u8),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Install the teardown triggers. Idempotent: the first call
    /// transitions `Uninstalled → Installed` and hooks SIGINT/SIGTERM;
    /// every later call is a no-op, so duplicate listeners are never
    /// registered.
    ///
    /// The normal-exit trigger is the [`TeardownGuard`] scope guard held
    /// at the program's entry point (see [`cleanup::guard`]); signals
    /// cannot cover a plain `return` from `main`.
    ///
    /// [`TeardownGuard`]: crate::cleanup::TeardownGuard
    /// [`cleanup::guard`]: crate::cleanup::guard
    pub fn install(&'static self) {
        let installed = self
            .state
            .compare_exchange(
                Lifecycle::Uninstalled as u8,
                Lifecycle::Installed as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if !installed {
            return;
        }

        self.spawn_signal_listeners();
        info!("cleanup registry installed");
    }

    fn spawn_signal_listeners(&'static self) {
        let Ok(handle) = Handle::try_current() else {
            warn!("no tokio runtime; signal-driven teardown disabled, relying on the exit guard");
            return;
        };

        handle.spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for SIGINT");
                return;
            }
            info!("interrupt received; running teardown");
            self.teardown();
            std::process::exit(130); // 128 + SIGINT
        });

        #[cfg(unix)]
        handle.spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let mut term = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, "failed to listen for SIGTERM");
                    return;
                }
            };
            term.recv().await;
            info!("terminate received; running teardown");
            self.teardown();
            std::process::exit(143); // 128 + SIGTERM
        });
    }

    /// Push a teardown callback. Actions run in reverse-registration
    /// order. Installs the registry first if needed.
    pub fn register_action(&'static self, action: impl FnOnce() + Send + 'static) {
        self.install();
        self.push_action(CleanupAction::Callback(Box::new(action)));
    }

    /// Push a teardown command (argv tokens). Runs via a blocking
    /// `std::process::Command` during teardown; a nonzero exit or spawn
    /// error is logged and never escalated.
    pub fn register_command(&'static self, invocation: Invocation) {
        self.install();
        debug!(cmd = %invocation, "registered cleanup command");
        self.push_action(CleanupAction::Command(invocation));
    }

    fn push_action(&self, action: CleanupAction) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.actions.push(action);
    }

    /// Mark `path` as an ephemeral file, deleted (best-effort) during
    /// teardown.
    pub fn register_temp_file(&'static self, path: impl Into<PathBuf>) {
        self.install();
        let path = path.into();
        debug!(path = %path.display(), "registered temp file");
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.temp_files.insert(path);
    }

    /// Mark `path` as an ephemeral directory, deleted recursively
    /// (best-effort) during teardown.
    pub fn register_temp_dir(&'static self, path: impl Into<PathBuf>) {
        self.install();
        let path = path.into();
        debug!(path = %path.display(), "registered temp dir");
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.temp_dirs.insert(path);
    }

    /// Run a command through the gateway in capture mode and auto-register
    /// its output path for cleanup.
    ///
    /// Heuristic convenience, not a contract: only when the trimmed
    /// captured output is a single line naming an existing file or
    /// directory is anything registered. Multi-line output is ambiguous
    /// and deliberately left alone. The exit status is propagated
    /// verbatim either way.
    pub async fn run_protected(
        &'static self,
        invocation: &Invocation,
    ) -> Result<ExecOutput, ExecError> {
        self.install();
        let output = execute(invocation, OutputMode::Capture).await?;

        if let Some(stdout) = output.stdout.as_deref() {
            let trimmed = stdout.trim();
            if !trimmed.is_empty() && !trimmed.contains('\n') {
                let path = Path::new(trimmed);
                if path.is_file() {
                    debug!(path = %path.display(), "auto-registering file from command output");
                    self.register_temp_file(path.to_path_buf());
                } else if path.is_dir() {
                    debug!(path = %path.display(), "auto-registering dir from command output");
                    self.register_temp_dir(path.to_path_buf());
                }
            }
        }

        Ok(output)
    }

    /// Run teardown exactly once: every registered action in strict
    /// reverse-registration order, then temp files, then temp dirs.
    ///
    /// The first caller (normal exit, SIGINT, or SIGTERM) wins the
    /// compare-and-set into `TearingDown`; later callers return
    /// immediately. A failing or panicking action is caught and logged
    /// and does not stop the remaining actions. Path deletion is
    /// best-effort; "already gone" is not an error.
    pub fn teardown(&self) {
        let tearing = Lifecycle::TearingDown as u8;
        let won = self
            .state
            .compare_exchange(
                Lifecycle::Installed as u8,
                tearing,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
            || self
                .state
                .compare_exchange(
                    Lifecycle::Uninstalled as u8,
                    tearing,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok();
        if !won {
            debug!("teardown already triggered; ignoring");
            return;
        }

        let drained = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *inner)
        };

        info!(
            actions = drained.actions.len(),
            files = drained.temp_files.len(),
            dirs = drained.temp_dirs.len(),
            "running teardown"
        );

        for action in drained.actions.into_iter().rev() {
            run_action(action);
        }

        for path in &drained.temp_files {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed temp file"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to remove temp file");
                }
            }
        }

        for path in &drained.temp_dirs {
            match std::fs::remove_dir_all(path) {
                Ok(()) => debug!(path = %path.display(), "removed temp dir"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to remove temp dir");
                }
            }
        }

        self.state.store(Lifecycle::Done as u8, Ordering::SeqCst);
        info!("teardown complete");
    }

    /// Testing hatch: forget every registered action and path without
    /// running them. The lifecycle state is left untouched.
    pub fn clear_all(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.actions.clear();
        inner.temp_files.clear();
        inner.temp_dirs.clear();
    }
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn run_action(action: CleanupAction) {
    match action {
        CleanupAction::Callback(callback) => {
            if catch_unwind(AssertUnwindSafe(callback)).is_err() {
                warn!("cleanup action panicked; continuing with remaining actions");
            }
        }
        CleanupAction::Command(invocation) => {
            if invocation.is_empty() {
                warn!("empty cleanup command; skipping");
                return;
            }
            match invocation.to_std_command().status() {
                Ok(status) if status.success() => {
                    debug!(cmd = %invocation, "cleanup command succeeded");
                }
                Ok(status) => {
                    warn!(
                        cmd = %invocation,
                        exit_code = status.code().unwrap_or(-1),
                        "cleanup command failed"
                    );
                }
                Err(err) => {
                    warn!(cmd = %invocation, error = %err, "cleanup command could not run");
                }
            }
        }
    }
}
