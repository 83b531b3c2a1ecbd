use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use warden_core::spawn_background_future;

use crate::config::LogsConfig;
use crate::diagnostics::{caller_label, DiagnosticEnricher};
use crate::dispatch::{DispatchConfig, DispatchQueue, DispatchStats};
use crate::error::LogsError;
use crate::level::{LevelFilter, LogCategory, Severity};
use crate::normalize::normalize;
use crate::render::{render_comment, RenderedViews};
use crate::sink::{ConsoleSink, LogStore, QueueEntry, ThreadSink};
use crate::value::{CapturedError, LogValue};

/// What a logging call hands back. Glue code typically returns it as an error:
/// `return Err(logs.error("No assignees", None).into())`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogReturn {
    pub raw: String,
    pub diff: String,
    pub severity: Severity,
    pub category: LogCategory,
    pub metadata: Value,
    /// False when the dispatch queue refused the entry.
    pub enqueued: bool,
}

impl LogReturn {
    /// Issue-comment body: the diff block followed by the metadata block.
    pub fn comment_body(&self) -> String {
        render_comment(&self.diff, Some(&self.metadata), self.severity)
    }
}

impl fmt::Display for LogReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::error::Error for LogReturn {}

/// Structured logger shared by every event handler.
///
/// Console output happens inline, thread comments are posted in the background,
/// and persistence goes through the dispatch queue. No call ever fails.
#[derive(Clone)]
pub struct Logs {
    filter: LevelFilter,
    enricher: DiagnosticEnricher,
    console: Arc<dyn ConsoleSink>,
    thread: Option<Arc<dyn ThreadSink>>,
    dispatch: DispatchQueue,
}

impl Logs {
    /// Fails only when the configuration is invalid.
    pub fn new(
        config: &LogsConfig,
        store: Arc<dyn LogStore>,
        console: Arc<dyn ConsoleSink>,
    ) -> Result<Self, LogsError> {
        config.validate()?;
        Ok(Self {
            filter: config.level_filter()?,
            enricher: DiagnosticEnricher::new(config.revision.as_deref()),
            dispatch: DispatchQueue::new(DispatchConfig::from(config), store, console.clone()),
            console,
            thread: None,
        })
    }

    /// Attaches the discussion thread used by `to_thread()` calls.
    pub fn with_thread(mut self, thread: Arc<dyn ThreadSink>) -> Self {
        self.thread = Some(thread);
        self
    }

    pub fn max_severity(&self) -> Severity {
        self.filter.max()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatch.stats()
    }

    /// Waits for pending persistence writes. Returns false on timeout.
    pub async fn flush(&self, timeout: Duration) -> bool {
        self.dispatch.wait_idle(timeout).await
    }

    /// Same entry points, but each record is also posted to the discussion thread.
    pub fn to_thread(&self) -> ThreadLogs<'_> {
        ThreadLogs { logs: self }
    }

    #[track_caller]
    pub fn ok(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.emit(LogCategory::Ok, message, metadata, false, Location::caller())
    }

    #[track_caller]
    pub fn info(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.emit(LogCategory::Info, message, metadata, false, Location::caller())
    }

    #[track_caller]
    pub fn warn(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.emit(LogCategory::Warn, message, metadata, false, Location::caller())
    }

    #[track_caller]
    pub fn error(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.emit(LogCategory::Error, message, metadata, false, Location::caller())
    }

    #[track_caller]
    pub fn debug(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.emit(LogCategory::Debug, message, metadata, false, Location::caller())
    }

    #[track_caller]
    pub fn verbose(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.emit(LogCategory::Verbose, message, metadata, false, Location::caller())
    }

    #[track_caller]
    pub fn fatal(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.emit(LogCategory::Fatal, message, metadata, false, Location::caller())
    }

    /// Runs one record through the pipeline for an explicit category and call site.
    pub fn emit(
        &self,
        category: LogCategory,
        message: &str,
        metadata: Option<LogValue>,
        post_comment: bool,
        location: &Location<'_>,
    ) -> Option<LogReturn> {
        let severity = category.severity();
        if !self.filter.should_emit(severity) {
            return None;
        }

        let normalized = if category == LogCategory::Fatal {
            Some(fatal_metadata(message, metadata))
        } else {
            metadata.map(normalize)
        };
        let caller = caller_label(location);
        let metadata = Value::Object(self.enricher.enrich(normalized, Some(&caller)));
        let views = RenderedViews::render(category, message, Some(&metadata));

        self.console.emit(category, &views.plain);

        if post_comment {
            self.post_to_thread(render_comment(&views.diff, Some(&metadata), severity));
        }

        let entry = QueueEntry::new(views.raw.clone(), severity, Some(metadata.clone()));
        let enqueued = match self.dispatch.enqueue(entry) {
            Ok(()) => true,
            Err(error) => {
                self.console.emit(
                    LogCategory::Fatal,
                    &format!("Error adding log to queue: {error}\n{}", views.raw),
                );
                false
            }
        };

        Some(LogReturn {
            raw: views.raw,
            diff: views.diff,
            severity,
            category,
            metadata,
            enqueued,
        })
    }

    fn post_to_thread(&self, body: String) {
        let Some(thread) = self.thread.clone() else {
            return;
        };
        let console = self.console.clone();
        spawn_background_future("issue comment poster", async move {
            if let Err(error) = thread.post_comment(&body).await {
                console.emit(
                    LogCategory::Error,
                    &format!("Failed to post log comment: {error:#}"),
                );
            }
        });
    }
}

/// `fatal` always carries an error record; the logger's own frame is stripped
/// from errors it synthesizes or receives directly.
fn fatal_metadata(message: &str, metadata: Option<LogValue>) -> Value {
    match metadata {
        None => {
            let mut synthetic = CapturedError::synthetic(message);
            synthetic.strip_logger_frames();
            synthetic.into_json()
        }
        Some(LogValue::Error(mut error)) => {
            error.strip_logger_frames();
            error.into_json()
        }
        Some(other) => normalize(other),
    }
}

/// Borrowed view of [`Logs`] whose records are also posted as issue comments.
pub struct ThreadLogs<'a> {
    logs: &'a Logs,
}

impl ThreadLogs<'_> {
    #[track_caller]
    pub fn ok(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.logs
            .emit(LogCategory::Ok, message, metadata, true, Location::caller())
    }

    #[track_caller]
    pub fn info(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.logs
            .emit(LogCategory::Info, message, metadata, true, Location::caller())
    }

    #[track_caller]
    pub fn warn(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.logs
            .emit(LogCategory::Warn, message, metadata, true, Location::caller())
    }

    #[track_caller]
    pub fn error(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.logs
            .emit(LogCategory::Error, message, metadata, true, Location::caller())
    }

    #[track_caller]
    pub fn debug(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.logs
            .emit(LogCategory::Debug, message, metadata, true, Location::caller())
    }

    #[track_caller]
    pub fn verbose(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.logs
            .emit(LogCategory::Verbose, message, metadata, true, Location::caller())
    }

    #[track_caller]
    pub fn fatal(&self, message: &str, metadata: Option<LogValue>) -> Option<LogReturn> {
        self.logs
            .emit(LogCategory::Fatal, message, metadata, true, Location::caller())
    }
}
