// Unit tests for logger module initialization logic
// Tests focus on thread-safety and error handling

use crate::logger::{LOG_FILE_NAME, initialize, open_log_file};

use std::path::PathBuf;

use tempfile::TempDir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: Startup and tests may both reach logger initialization. If the
/// second call errors, the host would exit before binding its port.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed,
/// causing fern to fail when trying to set a global logger twice, or if the file
/// dispatch is dropped from the chain.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = TempDir::new().expect("temp dir");

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path());
    let result2 = initialize(temp_dir.path());

    // THEN: Both should return Ok (second one logs warning but doesn't error)
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(result2.is_ok(), "Second initialization should succeed (idempotent)");

    // AND: Records land in the log file in the bridge line format
    log::info!("bridge-log-marker");
    let contents = std::fs::read_to_string(temp_dir.path().join(LOG_FILE_NAME)).expect("read log file");
    let line = contents
        .lines()
        .find(|line| line.contains("bridge-log-marker"))
        .expect("marker should be logged");
    assert!(line.contains(" - INFO] bridge-log-marker ["), "unexpected format: {line}");
    assert!(line.contains("logger.rs:"), "line should name its source: {line}");
}

/// **VALUE**: Verifies that an unwritable log location becomes an error, not a panic.
///
/// **WHY THIS MATTERS**: If the data directory can't be written (permissions, disk full),
/// startup should report a clear error instead of crashing.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` is unwrapped.
#[test]
fn given_invalid_log_dir_when_open_log_file_then_returns_app_error() {
    // GIVEN: A path that can never be created on Unix-like systems
    let invalid_path = PathBuf::from("/dev/null/invalid-path").join(LOG_FILE_NAME);

    // WHEN: Opening the log file
    let result = open_log_file(&invalid_path);

    // THEN: Should return the app error variant naming the path
    let err = result.expect_err("should fail for invalid log directory");
    let err_string = format!("{err:?}");
    assert!(err_string.contains("App"), "Error should be NellieHostError::App: {err_string}");
    assert!(err.to_string().contains("invalid-path"));
}
