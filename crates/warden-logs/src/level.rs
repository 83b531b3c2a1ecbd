use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LogsError;

/// Persisted log severity. Lower ranks are always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Fatal,
    Error,
    Info,
    Verbose,
    Debug,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Fatal,
        Severity::Error,
        Severity::Info,
        Severity::Verbose,
        Severity::Debug,
    ];

    /// Numeric filter rank. Rank 3 is unassigned.
    pub fn rank(self) -> u8 {
        match self {
            Self::Fatal => 0,
            Self::Error => 1,
            Self::Info => 2,
            Self::Verbose => 4,
            Self::Debug => 5,
        }
    }

    /// Returns the stable uppercase wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LogsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str() == normalized)
            .ok_or_else(|| LogsError::InvalidSeverity(raw.to_string()))
    }
}

/// Call-site category. Selects the console style, the diff prefix, and the severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Ok,
    Info,
    Warn,
    Error,
    Debug,
    Fatal,
    Verbose,
}

impl LogCategory {
    pub const ALL: [LogCategory; 7] = [
        LogCategory::Ok,
        LogCategory::Info,
        LogCategory::Warn,
        LogCategory::Error,
        LogCategory::Debug,
        LogCategory::Fatal,
        LogCategory::Verbose,
    ];

    /// Severity recorded for this category. `Warn` shares the ERROR rank.
    pub fn severity(self) -> Severity {
        match self {
            Self::Ok | Self::Info => Severity::Info,
            Self::Warn | Self::Error => Severity::Error,
            Self::Debug => Severity::Debug,
            Self::Fatal => Severity::Fatal,
            Self::Verbose => Severity::Verbose,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Fatal => "fatal",
            Self::Verbose => "verbose",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity gate resolved once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelFilter {
    max: Severity,
}

impl LevelFilter {
    pub fn new(max: Severity) -> Self {
        Self { max }
    }

    /// Resolves a configured severity name, failing on anything unknown.
    pub fn parse(raw: &str) -> Result<Self, LogsError> {
        raw.parse::<Severity>().map(Self::new)
    }

    pub fn max(self) -> Severity {
        self.max
    }

    pub fn should_emit(self, severity: Severity) -> bool {
        should_emit(severity, self.max)
    }
}

pub fn should_emit(severity: Severity, max: Severity) -> bool {
    severity.rank() <= max.rank()
}
