use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use warden_core::RotationPolicy;
use warden_github::{DiscussionContext, GithubApiClient, GithubClientConfig, GithubThreadSink};
use warden_logs::{
    ConsoleSink, LogCategory, LogStore, LogValue, Logs, LogsConfig, MemoryLogStore, ThreadSink,
    TracingConsole,
};
use warden_store::{JsonlLogStore, RestLogStore, RestStoreConfig};

use crate::cli_args::Cli;

/// File config (if any) with CLI/env overrides applied on top.
pub fn resolve_logs_config(cli: &Cli) -> Result<LogsConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => LogsConfig::load(path)?,
        None => LogsConfig::default(),
    };
    if let Some(max_verbosity) = cli.max_verbosity.as_ref() {
        config.max_verbosity = max_verbosity.clone();
    }
    if let Some(retry_limit) = cli.retry_limit {
        config.retry_limit = retry_limit;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(retry_delay_ms) = cli.retry_delay_ms {
        config.retry_delay_ms = retry_delay_ms;
    }
    if let Some(queue_capacity) = cli.queue_capacity {
        config.queue_capacity = queue_capacity;
    }
    if let Some(revision) = cli.revision.as_ref() {
        config.revision = Some(revision.clone());
    }
    config.validate()?;
    Ok(config)
}

pub fn build_store(cli: &Cli) -> Result<Arc<dyn LogStore>> {
    match (cli.store_url.as_deref(), cli.store_file.as_ref()) {
        (Some(_), Some(_)) => bail!("--store-url and --store-file are mutually exclusive"),
        (Some(url), None) => {
            let key = cli
                .store_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .context("--store-key is required with --store-url")?;
            Ok(Arc::new(RestLogStore::new(&RestStoreConfig::new(url, key))?))
        }
        (None, Some(path)) => Ok(Arc::new(JsonlLogStore::new(path, RotationPolicy::from_env()))),
        (None, None) => {
            tracing::warn!("no log store configured; records are kept in memory only");
            Ok(Arc::new(MemoryLogStore::new()))
        }
    }
}

pub fn build_thread_sink(cli: &Cli) -> Result<Option<GithubThreadSink>> {
    if !cli.post_comment {
        return Ok(None);
    }
    let repo = cli
        .github_repo
        .as_deref()
        .context("--github-repo is required with --post-comment")?;
    let issue_number = cli
        .issue_number
        .context("--issue-number is required with --post-comment")?;
    let token = cli
        .github_token
        .as_deref()
        .context("--github-token is required with --post-comment")?;
    let context = DiscussionContext::parse(repo, issue_number)?;
    let client = GithubApiClient::new(&GithubClientConfig {
        api_base: cli.github_api_base.clone(),
        ..GithubClientConfig::new(token)
    })?;
    Ok(Some(GithubThreadSink::new(client, context)))
}

/// Emits the record described by `cli`, waits for persistence, and returns a
/// JSON summary of the outcome.
pub async fn run_cli(cli: Cli, console: Arc<dyn ConsoleSink>) -> Result<Value> {
    let config = resolve_logs_config(&cli)?;
    let store = build_store(&cli)?;
    let logs = Logs::new(&config, store, console.clone())?;
    let thread = build_thread_sink(&cli)?;

    let metadata = cli.metadata.clone().map(LogValue::from);
    let record = logs.emit(
        cli.category,
        &cli.message,
        metadata,
        false,
        std::panic::Location::caller(),
    );

    // Awaited so the process does not exit before the comment lands. Failures
    // stay on the console like every other thread post.
    let mut comment_posted = false;
    if let (Some(thread), Some(record)) = (thread.as_ref(), record.as_ref()) {
        match thread.post_comment(&record.comment_body()).await {
            Ok(()) => comment_posted = true,
            Err(error) => console.emit(
                LogCategory::Error,
                &format!("Failed to post log comment: {error:#}"),
            ),
        }
    }

    let flushed = logs
        .flush(Duration::from_millis(cli.flush_timeout_ms))
        .await;
    if !flushed {
        bail!(
            "log persistence did not finish within {}ms",
            cli.flush_timeout_ms
        );
    }

    Ok(json!({
        "emitted": record.is_some(),
        "comment_posted": comment_posted,
        "record": record,
        "dispatch": logs.dispatch_stats(),
    }))
}

pub fn default_console() -> Arc<dyn ConsoleSink> {
    Arc::new(TracingConsole)
}
