use std::error::Error;
use std::time::{Duration, Instant};

use runcore::{ExecError, Invocation, exit_codes, run_with_timeout};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn slow_command_is_killed_at_the_deadline() -> TestResult {
    let inv = Invocation::new("sleep").arg("10");

    let start = Instant::now();
    let status = run_with_timeout(&inv, Duration::from_millis(300)).await?;
    let elapsed = start.elapsed();

    assert_eq!(status, exit_codes::TIMED_OUT);
    // Returns near the limit, not the sleep duration.
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");

    Ok(())
}

#[tokio::test]
async fn fast_command_returns_its_real_status() -> TestResult {
    let inv = Invocation::new("sh").args(["-c", "exit 3"]);
    let status = run_with_timeout(&inv, Duration::from_secs(5)).await?;
    assert_eq!(status, 3);

    let inv = Invocation::new("true");
    let status = run_with_timeout(&inv, Duration::from_secs(5)).await?;
    assert_eq!(status, exit_codes::SUCCESS);

    Ok(())
}

#[tokio::test]
async fn empty_invocation_is_rejected() {
    let inv = Invocation::from_tokens(Vec::<String>::new());
    let err = run_with_timeout(&inv, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::EmptyInvocation));
}

#[tokio::test]
async fn no_child_survives_a_timeout() -> TestResult {
    let dir = tempdir()?;
    let marker = dir.path().join("survived");
    // If the shell (or its sleep) outlived the kill, the marker would
    // appear once the sleep finishes.
    let script = format!("sleep 1; echo alive > {}", marker.display());
    let inv = Invocation::new("sh").args(["-c", script.as_str()]);

    let status = run_with_timeout(&inv, Duration::from_millis(200)).await?;
    assert_eq!(status, exit_codes::TIMED_OUT);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "child process group outlived the deadline");

    Ok(())
}
