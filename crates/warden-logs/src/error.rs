use thiserror::Error;

/// Construction-time configuration failures. Nothing else in the pipeline surfaces an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogsError {
    #[error("invalid log severity '{0}' (expected one of FATAL, ERROR, INFO, VERBOSE, DEBUG)")]
    InvalidSeverity(String),
    #[error("invalid logs config '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("failed to parse logs config: {0}")]
    Parse(String),
}

/// Reasons an entry was not accepted by the dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatch queue is full ({capacity} pending entries)")]
    QueueFull { capacity: usize },
}

/// Failure reported by a persistent store. The queue only cares that it failed.
#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("log store transport failed: {0}")]
    Transport(String),
    #[error("log store rejected insert with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("log store unavailable: {0}")]
    Unavailable(String),
}
