//! Delivery targets for rendered records.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use warden_core::lock_unpoisoned;

use crate::error::LogStoreError;
use crate::level::{LogCategory, Severity};

/// Persisted log row: `{ log, level, metadata }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    pub log: String,
    pub level: Severity,
    pub metadata: Option<Value>,
    #[serde(skip)]
    pub queued_unix_ms: u64,
}

impl QueueEntry {
    pub fn new(log: impl Into<String>, level: Severity, metadata: Option<Value>) -> Self {
        Self {
            log: log.into(),
            level,
            metadata,
            queued_unix_ms: warden_core::current_unix_timestamp_ms(),
        }
    }
}

/// Persistent store written by dispatch workers.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert_log(&self, entry: &QueueEntry) -> Result<(), LogStoreError>;
}

/// Synchronous local output. Must never fail the caller.
pub trait ConsoleSink: Send + Sync {
    fn emit(&self, category: LogCategory, text: &str);
}

/// Discussion thread (issue comments) that accepts rendered records.
#[async_trait]
pub trait ThreadSink: Send + Sync {
    async fn post_comment(&self, body: &str) -> Result<()>;
}

/// Console sink that forwards records to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn emit(&self, category: LogCategory, text: &str) {
        let severity = category.severity().as_str();
        let label = category.as_str();
        match category {
            LogCategory::Fatal | LogCategory::Error => {
                tracing::error!(category = label, severity, "{text}")
            }
            LogCategory::Warn => tracing::warn!(category = label, severity, "{text}"),
            LogCategory::Ok | LogCategory::Info => {
                tracing::info!(category = label, severity, "{text}")
            }
            LogCategory::Verbose => tracing::debug!(category = label, severity, "{text}"),
            LogCategory::Debug => tracing::trace!(category = label, severity, "{text}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub category: LogCategory,
    pub text: String,
}

/// Console sink that keeps every line in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ConsoleLine> {
        lock_unpoisoned(&self.lines).clone()
    }

    pub fn contains(&self, category: LogCategory, needle: &str) -> bool {
        lock_unpoisoned(&self.lines)
            .iter()
            .any(|line| line.category == category && line.text.contains(needle))
    }
}

impl ConsoleSink for MemoryConsole {
    fn emit(&self, category: LogCategory, text: &str) {
        lock_unpoisoned(&self.lines).push(ConsoleLine {
            category,
            text: text.to_string(),
        });
    }
}

/// In-memory store for tests and local runs. `fail_next` injects transient failures.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<QueueEntry>>,
    pending_failures: Mutex<usize>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<QueueEntry> {
        lock_unpoisoned(&self.entries).clone()
    }

    pub fn fail_next(&self, count: usize) {
        *lock_unpoisoned(&self.pending_failures) = count;
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert_log(&self, entry: &QueueEntry) -> Result<(), LogStoreError> {
        {
            let mut pending = lock_unpoisoned(&self.pending_failures);
            if *pending > 0 {
                *pending -= 1;
                return Err(LogStoreError::Unavailable(
                    "injected memory store failure".to_string(),
                ));
            }
        }
        lock_unpoisoned(&self.entries).push(entry.clone());
        Ok(())
    }
}
