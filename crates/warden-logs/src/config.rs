use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::BUILD_REVISION;
use crate::error::LogsError;
use crate::level::{LevelFilter, Severity};

const DEFAULT_MAX_VERBOSITY: &str = "INFO";
const DEFAULT_CONCURRENCY: usize = 6;
const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Logging pipeline configuration, loadable from the `[logs]` table of a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogsConfig {
    /// Most verbose severity still emitted (inclusive).
    pub max_verbosity: String,
    /// Extra delivery attempts after the first failure. Zero disables retry.
    pub retry_limit: u32,
    /// Maximum concurrently active persistence workers.
    pub concurrency: usize,
    pub retry_delay_ms: u64,
    /// Pending persistence entries before new ones are rejected. Zero means unbounded.
    pub queue_capacity: usize,
    pub revision: Option<String>,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            max_verbosity: DEFAULT_MAX_VERBOSITY.to_string(),
            retry_limit: 0,
            concurrency: DEFAULT_CONCURRENCY,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            revision: BUILD_REVISION.map(ToOwned::to_owned),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LogsConfigFile {
    #[serde(default)]
    logs: LogsConfig,
}

impl LogsConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, LogsError> {
        let parsed: LogsConfigFile =
            toml::from_str(raw).map_err(|error| LogsError::Parse(error.to_string()))?;
        parsed.logs.validate()?;
        Ok(parsed.logs)
    }

    pub fn load(path: &Path) -> Result<Self, LogsError> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            LogsError::Parse(format!("failed to read {}: {error}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn level_filter(&self) -> Result<LevelFilter, LogsError> {
        LevelFilter::parse(&self.max_verbosity)
    }

    pub fn max_severity(&self) -> Result<Severity, LogsError> {
        self.level_filter().map(LevelFilter::max)
    }

    /// Bounded capacity, or `None` when the queue is unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.queue_capacity > 0).then_some(self.queue_capacity)
    }

    pub fn validate(&self) -> Result<(), LogsError> {
        self.level_filter()?;
        if self.concurrency == 0 {
            return Err(LogsError::InvalidConfig {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
