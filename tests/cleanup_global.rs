use runcore::cleanup;

// All assertions about the process-wide accessor live in one test: the
// OnceLock registry is shared by every test in this binary.
#[tokio::test]
async fn global_accessor_is_explicit_and_idempotent() {
    let first = cleanup::init();
    let second = cleanup::init();
    assert!(std::ptr::eq(first, second));

    let fetched = cleanup::get().expect("init was called");
    assert!(std::ptr::eq(first, fetched));

    // Explicit shutdown runs teardown once; a second call is a no-op.
    cleanup::shutdown();
    cleanup::shutdown();
    assert_eq!(fetched.lifecycle(), cleanup::Lifecycle::Done);
}
