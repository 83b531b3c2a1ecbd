use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use warden_core::{lock_unpoisoned, RotatingAppender, RotationPolicy};
use warden_logs::{LogStore, LogStoreError, QueueEntry, Severity};

#[derive(Serialize)]
struct JsonlRow<'a> {
    created_at: String,
    log: &'a str,
    level: Severity,
    metadata: Option<&'a Value>,
}

/// Local store that appends one JSON object per record to a rotating file.
#[derive(Debug)]
pub struct JsonlLogStore {
    appender: RotatingAppender,
    write_lock: Mutex<()>,
}

impl JsonlLogStore {
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        Self {
            appender: RotatingAppender::new(path, policy),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        self.appender.path()
    }

    /// Rows in the active file, oldest first. A missing file reads as empty.
    pub fn read_rows(&self) -> Result<Vec<Value>, LogStoreError> {
        let raw = match std::fs::read_to_string(self.path()) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(LogStoreError::from))
            .collect()
    }
}

#[async_trait]
impl LogStore for JsonlLogStore {
    async fn insert_log(&self, entry: &QueueEntry) -> Result<(), LogStoreError> {
        let row = JsonlRow {
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            log: &entry.log,
            level: entry.level,
            metadata: entry.metadata.as_ref(),
        };
        let line = serde_json::to_string(&row)?;
        let _guard = lock_unpoisoned(&self.write_lock);
        self.appender
            .append_line(&line)
            .map_err(|error| LogStoreError::Unavailable(format!("{error:#}")))
    }
}
