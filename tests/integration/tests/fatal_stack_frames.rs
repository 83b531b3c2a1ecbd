//! Runs in its own binary: backtrace capture is decided once per process.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use warden_logs::{Logs, LogsConfig, MemoryConsole, MemoryLogStore};

#[tokio::test]
async fn regression_fatal_stack_starts_at_the_caller_when_backtraces_are_captured() {
    std::env::set_var("RUST_BACKTRACE", "1");
    std::env::set_var("RUST_LIB_BACKTRACE", "1");

    let logs = Logs::new(
        &LogsConfig::default(),
        Arc::new(MemoryLogStore::new()),
        Arc::new(MemoryConsole::new()),
    )
    .expect("logs");
    let returned = logs.fatal("boom", None).expect("fatal");

    let stack: Vec<&str> = returned.metadata["stack"]
        .as_array()
        .expect("stack array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(stack[0], "Error: boom");
    assert!(stack.len() > 1, "no frames captured: {stack:?}");
    for frame in &stack[1..] {
        assert!(!frame.contains("warden_logs::facade"), "{frame}");
        assert!(!frame.contains("warden_logs::value"), "{frame}");
        assert!(!frame.starts_with("at "), "orphan location line: {frame}");
    }
    assert!(
        stack[1].contains("fatal_stack_frames"),
        "first frame is not the caller: {stack:?}"
    );
    assert!(logs.flush(Duration::from_secs(5)).await);
}
