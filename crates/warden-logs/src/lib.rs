//! Structured logging for bot event handlers.
//!
//! A [`Logs`] facade filters records by severity and normalizes metadata
//! (captured errors included). It tags each record with its call site and
//! build revision, then renders three views: raw text, a GitHub diff block
//! and plain console text. Records reach the console synchronously and can
//! optionally be posted to a discussion thread. Persistence goes through a
//! bounded-concurrency [`DispatchQueue`] with retry.

pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod level;
pub mod normalize;
pub mod render;
pub mod sink;
pub mod value;

pub use config::LogsConfig;
pub use diagnostics::{caller_label, short_revision, DiagnosticEnricher, BUILD_REVISION};
pub use dispatch::{DispatchConfig, DispatchQueue, DispatchStats};
pub use error::{DispatchError, LogStoreError, LogsError};
pub use facade::{LogReturn, Logs, ThreadLogs};
pub use level::{should_emit, LevelFilter, LogCategory, Severity};
pub use normalize::normalize;
pub use render::{render_comment, render_diff, render_metadata, render_plain, RenderedViews};
pub use sink::{
    ConsoleLine, ConsoleSink, LogStore, MemoryConsole, MemoryLogStore, QueueEntry, ThreadSink,
    TracingConsole,
};
pub use value::{CapturedError, LogValue};
