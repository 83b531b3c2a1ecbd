use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use warden_core::RotationPolicy;
use warden_github::{DiscussionContext, GithubApiClient, GithubClientConfig, GithubThreadSink};
use warden_logs::{
    LogCategory, LogStore, LogStoreError, LogValue, Logs, LogsConfig, MemoryConsole, QueueEntry,
    Severity,
};
use warden_store::{JsonlLogStore, RestLogStore, RestStoreConfig};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

fn config(max_verbosity: &str, retry_limit: u32) -> LogsConfig {
    LogsConfig {
        max_verbosity: max_verbosity.to_string(),
        retry_limit,
        retry_delay_ms: 1,
        revision: Some("9f8e7d6c5b4a".to_string()),
        ..LogsConfig::default()
    }
}

/// Fails the first `failures` inserts before delegating.
struct FlakyStore<S> {
    inner: S,
    failures: usize,
    attempts: AtomicUsize,
}

impl<S> FlakyStore<S> {
    fn new(inner: S, failures: usize) -> Self {
        Self {
            inner,
            failures,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<S: LogStore> LogStore for FlakyStore<S> {
    async fn insert_log(&self, entry: &QueueEntry) -> Result<(), LogStoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(LogStoreError::Transport("connection reset".to_string()));
        }
        self.inner.insert_log(entry).await
    }
}

#[tokio::test]
async fn integration_error_record_reaches_rest_store_and_issue_thread() {
    let server = MockServer::start();
    let insert = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/logs")
            .json_body_includes(
                json!({
                    "log": "disk full",
                    "level": "ERROR",
                    "metadata": {"code": 28, "revision": "9f8e7d6"}
                })
                .to_string(),
            );
        then.status(201);
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/ubiquity/bot/issues/4/comments")
            .body_includes("! disk full")
            .body_includes("<!--");
        then.status(201).json_body(json!({"id": 1}));
    });

    let store = RestLogStore::new(&RestStoreConfig::new(server.base_url(), "service-key"))
        .expect("rest store");
    let github = GithubApiClient::new(&GithubClientConfig {
        api_base: server.base_url(),
        retry_base_delay_ms: 1,
        ..GithubClientConfig::new("gh-token")
    })
    .expect("github client");
    let thread = GithubThreadSink::new(github, DiscussionContext::new("ubiquity", "bot", 4));
    let console = Arc::new(MemoryConsole::new());
    let logs = Logs::new(&config("INFO", 0), Arc::new(store), console.clone())
        .expect("logs")
        .with_thread(Arc::new(thread));

    let returned = logs
        .to_thread()
        .error("disk full", Some(json!({"code": 28}).into()))
        .expect("emitted");
    assert_eq!(returned.diff, "```diff\n! disk full\n```");
    assert!(returned.enqueued);

    assert!(logs.flush(FLUSH_TIMEOUT).await);
    assert_eq!(insert.calls(), 1);

    let deadline = tokio::time::Instant::now() + FLUSH_TIMEOUT;
    while comment.calls() == 0 {
        assert!(tokio::time::Instant::now() < deadline, "comment never posted");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(comment.calls(), 1);
    assert!(console.contains(LogCategory::Error, "disk full"));
}

#[tokio::test]
async fn integration_transient_store_failures_are_retried_into_jsonl_file() {
    let dir = tempdir().expect("tempdir");
    let jsonl = JsonlLogStore::new(dir.path().join("logs.jsonl"), RotationPolicy::default());
    let store = Arc::new(FlakyStore::new(jsonl, 2));
    let console = Arc::new(MemoryConsole::new());
    let logs = Logs::new(&config("DEBUG", 3), store.clone(), console.clone()).expect("logs");

    logs.debug("cache warmed", None).expect("debug");
    assert!(logs.flush(FLUSH_TIMEOUT).await);

    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    let rows = store.inner.read_rows().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["level"], json!("DEBUG"));
    let stats = logs.dispatch_stats();
    assert_eq!(stats.delivered_total, 1);
    assert_eq!(stats.dropped_total, 0);
    let retry_notices = console
        .lines()
        .into_iter()
        .filter(|line| line.text.starts_with("Error sending log, retrying"))
        .count();
    assert_eq!(retry_notices, 2);
}

#[tokio::test]
async fn integration_exhausted_retries_drop_entry_without_failing_callers() {
    let server = MockServer::start();
    let insert = server.mock(|when, then| {
        when.method(POST).path("/rest/v1/logs");
        then.status(503).body("upstream unavailable");
    });
    let store = RestLogStore::new(&RestStoreConfig::new(server.base_url(), "key"))
        .expect("rest store");
    let console = Arc::new(MemoryConsole::new());
    let logs = Logs::new(&config("INFO", 2), Arc::new(store), console.clone()).expect("logs");

    let returned = logs.warn("label missing", None).expect("warn");
    assert_eq!(returned.severity, Severity::Error);
    assert!(logs.flush(FLUSH_TIMEOUT).await);

    assert_eq!(insert.calls(), 3);
    assert_eq!(logs.dispatch_stats().dropped_total, 1);
    assert!(console.contains(LogCategory::Fatal, "Max retry limit reached for log"));
    assert!(console.contains(LogCategory::Fatal, "status 503"));
}

#[tokio::test]
async fn integration_burst_of_records_all_persist_under_bounded_concurrency() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonlLogStore::new(
        dir.path().join("burst.jsonl"),
        RotationPolicy::default(),
    ));
    let logs = Logs::new(&config("INFO", 0), store.clone(), Arc::new(MemoryConsole::new()))
        .expect("logs");

    for index in 0..200_i64 {
        let metadata = LogValue::map([("index", LogValue::from(index))]);
        logs.info(&format!("record {index}"), Some(metadata))
            .expect("info");
    }
    assert!(logs.flush(FLUSH_TIMEOUT).await);

    let rows = store.read_rows().expect("rows");
    assert_eq!(rows.len(), 200);
    let stats = logs.dispatch_stats();
    assert_eq!(stats.delivered_total, 200);
    assert_eq!(stats.active_workers, 0);
    assert_eq!(stats.queued, 0);
}

#[tokio::test]
async fn integration_fatal_comment_exposes_metadata_as_json_block() {
    let server = MockServer::start();
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/owner/repo/issues/2/comments")
            .body_includes("```json");
        then.status(201).json_body(json!({"id": 2}));
    });
    let github = GithubApiClient::new(&GithubClientConfig {
        api_base: server.base_url(),
        ..GithubClientConfig::new("gh-token")
    })
    .expect("github client");
    let thread = GithubThreadSink::new(github, DiscussionContext::new("owner", "repo", 2));
    let logs = Logs::new(
        &config("FATAL", 0),
        Arc::new(warden_logs::MemoryLogStore::new()),
        Arc::new(MemoryConsole::new()),
    )
    .expect("logs")
    .with_thread(Arc::new(thread));

    assert!(logs.to_thread().error("filtered out", None).is_none());
    let returned = logs
        .to_thread()
        .fatal("Issue is not defined", None)
        .expect("fatal");
    assert_eq!(returned.metadata["name"], json!("Error"));

    let deadline = tokio::time::Instant::now() + FLUSH_TIMEOUT;
    while comment.calls() == 0 {
        assert!(tokio::time::Instant::now() < deadline, "comment never posted");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(logs.flush(FLUSH_TIMEOUT).await);
    assert_eq!(comment.calls(), 1);
}
