use std::error::Error;
use std::fs;
use std::sync::{Arc, Mutex};

use runcore::cleanup::{CleanupRegistry, Lifecycle};
use runcore::{Invocation, exit_codes};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

/// Registration methods require `&'static self` (the process-wide
/// registry lives in a `OnceLock`); tests leak a fresh instance each to
/// stay independent of each other.
fn leaked_registry() -> &'static CleanupRegistry {
    Box::leak(Box::new(CleanupRegistry::new()))
}

fn recorder() -> (
    Arc<Mutex<Vec<&'static str>>>,
    impl Fn(&'static str) + Clone + Send + 'static,
) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let writer = {
        let log = log.clone();
        move |name: &'static str| log.lock().unwrap().push(name)
    };
    (log, writer)
}

#[tokio::test]
async fn actions_run_in_reverse_registration_order() {
    let registry = leaked_registry();
    let (log, record) = recorder();

    for name in ["A", "B", "C"] {
        let record = record.clone();
        registry.register_action(move || record(name));
    }

    registry.teardown();

    assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);
    assert_eq!(registry.lifecycle(), Lifecycle::Done);
}

#[tokio::test]
async fn teardown_runs_exactly_once() {
    let registry = leaked_registry();
    let (log, record) = recorder();

    registry.register_action(move || record("once"));

    registry.teardown();
    registry.teardown();

    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn install_is_idempotent() {
    let registry = leaked_registry();

    registry.install();
    registry.install();
    assert_eq!(registry.lifecycle(), Lifecycle::Installed);

    registry.teardown();
    assert_eq!(registry.lifecycle(), Lifecycle::Done);
}

#[tokio::test]
async fn panicking_action_does_not_stop_the_rest() {
    let registry = leaked_registry();
    let (log, record) = recorder();

    {
        let record = record.clone();
        registry.register_action(move || record("first"));
    }
    registry.register_action(|| panic!("cleanup gone wrong"));
    registry.register_action(move || record("last"));

    registry.teardown();

    // Reverse order, with the panicking middle action skipped over.
    assert_eq!(*log.lock().unwrap(), vec!["last", "first"]);
    assert_eq!(registry.lifecycle(), Lifecycle::Done);
}

#[tokio::test]
async fn failing_cleanup_command_does_not_stop_the_rest() {
    let registry = leaked_registry();
    let (log, record) = recorder();

    registry.register_action(move || record("ran"));
    registry.register_command(Invocation::new("false"));

    registry.teardown();

    assert_eq!(*log.lock().unwrap(), vec!["ran"]);
}

#[tokio::test]
async fn cleanup_command_runs_at_teardown() -> TestResult {
    let dir = tempdir()?;
    let witness = dir.path().join("witness");

    let registry = leaked_registry();
    registry.register_command(Invocation::new("touch").arg(witness.display().to_string()));

    assert!(!witness.exists());
    registry.teardown();
    assert!(witness.exists());

    Ok(())
}

#[tokio::test]
async fn registered_temp_paths_are_deleted() -> TestResult {
    let dir = tempdir()?;
    let file = dir.path().join("scratch.dat");
    let subdir = dir.path().join("scratch-dir");
    fs::write(&file, b"ephemeral")?;
    fs::create_dir(&subdir)?;
    fs::write(subdir.join("nested"), b"x")?;

    let registry = leaked_registry();
    registry.register_temp_file(&file);
    registry.register_temp_dir(&subdir);

    registry.teardown();

    assert!(!file.exists());
    assert!(!subdir.exists());

    Ok(())
}

#[tokio::test]
async fn missing_temp_paths_are_ignored() {
    let registry = leaked_registry();
    registry.register_temp_file("/tmp/runcore-test-never-created-4712");
    registry.register_temp_dir("/tmp/runcore-test-never-created-4712-dir");

    registry.teardown();
    assert_eq!(registry.lifecycle(), Lifecycle::Done);
}

#[tokio::test]
async fn clear_all_forgets_registrations_without_running_them() -> TestResult {
    let dir = tempdir()?;
    let file = dir.path().join("kept.dat");
    fs::write(&file, b"still here")?;

    let registry = leaked_registry();
    let (log, record) = recorder();
    registry.register_action(move || record("should not run"));
    registry.register_temp_file(&file);

    registry.clear_all();
    // Lifecycle is untouched by clear_all.
    assert_eq!(registry.lifecycle(), Lifecycle::Installed);

    registry.teardown();

    assert!(log.lock().unwrap().is_empty());
    assert!(file.exists());

    Ok(())
}

#[tokio::test]
async fn run_protected_propagates_exit_status_despite_failing_cleanup() -> TestResult {
    let registry = leaked_registry();
    registry.register_action(|| panic!("cleanup failure"));

    let inv = Invocation::new("sh").args(["-c", "exit 7"]);
    let out = registry.run_protected(&inv).await?;
    assert_eq!(out.status, 7);

    // Teardown failures never alter the captured status.
    registry.teardown();
    assert_eq!(out.status, 7);

    Ok(())
}

#[tokio::test]
async fn run_protected_registers_single_line_file_output() -> TestResult {
    let dir = tempdir()?;
    let file = dir.path().join("reported.dat");
    fs::write(&file, b"ephemeral")?;

    let registry = leaked_registry();
    let inv = Invocation::new("echo").arg(file.display().to_string());
    let out = registry.run_protected(&inv).await?;
    assert_eq!(out.status, exit_codes::SUCCESS);

    registry.teardown();
    assert!(!file.exists());

    Ok(())
}

#[tokio::test]
async fn run_protected_registers_single_line_dir_output() -> TestResult {
    let dir = tempdir()?;
    let subdir = dir.path().join("reported-dir");
    fs::create_dir(&subdir)?;

    let registry = leaked_registry();
    let inv = Invocation::new("echo").arg(subdir.display().to_string());
    registry.run_protected(&inv).await?;

    registry.teardown();
    assert!(!subdir.exists());

    Ok(())
}

#[tokio::test]
async fn run_protected_ignores_multi_line_output() -> TestResult {
    let dir = tempdir()?;
    let first = dir.path().join("one.dat");
    let second = dir.path().join("two.dat");
    fs::write(&first, b"1")?;
    fs::write(&second, b"2")?;

    let registry = leaked_registry();
    let script = format!("printf '%s\\n%s\\n' {} {}", first.display(), second.display());
    let inv = Invocation::new("sh").args(["-c", script.as_str()]);
    registry.run_protected(&inv).await?;

    registry.teardown();

    // Ambiguous multi-line output is never interpreted as paths.
    assert!(first.exists());
    assert!(second.exists());

    Ok(())
}

#[tokio::test]
async fn run_protected_ignores_output_that_is_not_a_path() -> TestResult {
    let registry = leaked_registry();
    let inv = Invocation::new("echo").arg("not a path at all");
    let out = registry.run_protected(&inv).await?;
    assert_eq!(out.status, exit_codes::SUCCESS);

    registry.teardown();
    assert_eq!(registry.lifecycle(), Lifecycle::Done);

    Ok(())
}
