use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const DEFAULT_ROTATION_MAX_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_ROTATION_MAX_FILES: usize = 5;
const ROTATION_MAX_BYTES_ENV: &str = "WARDEN_LOG_ROTATION_MAX_BYTES";
const ROTATION_MAX_FILES_ENV: &str = "WARDEN_LOG_ROTATION_MAX_FILES";

/// Size-based rotation limits for append-only record files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_ROTATION_MAX_BYTES,
            max_files: DEFAULT_ROTATION_MAX_FILES,
        }
    }
}

impl RotationPolicy {
    /// Reads limits from `WARDEN_LOG_ROTATION_*`, keeping defaults for missing or invalid values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_bytes: positive_env_value(ROTATION_MAX_BYTES_ENV).unwrap_or(defaults.max_bytes),
            max_files: positive_env_value(ROTATION_MAX_FILES_ENV)
                .and_then(|value| usize::try_from(value).ok())
                .unwrap_or(defaults.max_files),
        }
    }

    pub fn is_enabled(self) -> bool {
        self.max_bytes > 0 && self.max_files > 0
    }
}

fn positive_env_value(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

/// Appends NDJSON lines to one file, shifting it to `<path>.1`, `<path>.2`, ...
/// once the next write would exceed `max_bytes`.
#[derive(Debug, Clone)]
pub struct RotatingAppender {
    path: PathBuf,
    policy: RotationPolicy,
}

impl RotatingAppender {
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn append_line(&self, line: &str) -> Result<()> {
        let path = self.path.as_path();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        if self.policy.is_enabled() && path.exists() {
            let current_size = std::fs::metadata(path)
                .with_context(|| format!("failed to stat {}", path.display()))?
                .len();
            let incoming_size = u64::try_from(line.len().saturating_add(1)).unwrap_or(u64::MAX);
            if current_size.saturating_add(incoming_size) > self.policy.max_bytes {
                self.rotate()?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{line}").with_context(|| format!("failed to append {}", path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;
        Ok(())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.path.display(), index))
    }

    fn rotate(&self) -> Result<()> {
        let path = self.path.as_path();
        if self.policy.max_files <= 1 {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to rotate {}", path.display()))?;
            return Ok(());
        }

        let oldest = self.policy.max_files.saturating_sub(1);
        for index in (1..=oldest).rev() {
            let source = if index == 1 {
                self.path.clone()
            } else {
                self.backup_path(index - 1)
            };
            if !source.exists() {
                continue;
            }
            let destination = self.backup_path(index);
            if destination.exists() {
                std::fs::remove_file(&destination).with_context(|| {
                    format!("failed to replace rotated file {}", destination.display())
                })?;
            }
            std::fs::rename(&source, &destination).with_context(|| {
                format!(
                    "failed to rotate {} to {}",
                    source.display(),
                    destination.display()
                )
            })?;
        }
        Ok(())
    }
}
