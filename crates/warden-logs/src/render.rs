//! Text renditions of a log record: raw for storage, diff-fenced for issue
//! comments, plain for the console.

use serde_json::Value;

use crate::level::{LogCategory, Severity};

pub const UNSERIALIZABLE_METADATA: &str = "[unserializable metadata]";

const DIFF_FENCE_OPEN: &str = "```diff";
const JSON_FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Per-line marker that GitHub's diff highlighter colors: `-` red, `+` green,
/// `!` orange, `#` gray. `None` means the line is wrapped as `@@ line @@`.
fn diff_prefix(category: LogCategory) -> Option<&'static str> {
    match category {
        LogCategory::Fatal => Some("-"),
        LogCategory::Ok => Some("+"),
        LogCategory::Error => Some("!"),
        LogCategory::Debug => None,
        LogCategory::Info | LogCategory::Warn | LogCategory::Verbose => Some("#"),
    }
}

pub fn render_diff(category: LogCategory, message: &str) -> String {
    let body = message
        .trim()
        .split('\n')
        .map(|line| match diff_prefix(category) {
            Some(prefix) => format!("{prefix} {line}"),
            None => format!("@@ {line} @@"),
        })
        .collect::<Vec<_>>()
        .join("\n");
    [DIFF_FENCE_OPEN, body.as_str(), FENCE_CLOSE].join("\n")
}

pub fn pretty_metadata(metadata: &Value) -> String {
    serde_json::to_string_pretty(metadata).unwrap_or_else(|_| UNSERIALIZABLE_METADATA.to_string())
}

/// FATAL metadata is shown as a JSON block; everything else is hidden in an
/// HTML comment that only appears in the comment source.
pub fn render_metadata(metadata: &Value, severity: Severity) -> String {
    let pretty = pretty_metadata(metadata);
    if severity == Severity::Fatal {
        [JSON_FENCE_OPEN, pretty.as_str(), FENCE_CLOSE].join("\n")
    } else {
        ["<!--", pretty.as_str(), "-->"].join("\n")
    }
}

pub fn render_comment(diff: &str, metadata: Option<&Value>, severity: Severity) -> String {
    match metadata {
        Some(metadata) => [diff.to_string(), render_metadata(metadata, severity)].join("\n"),
        None => diff.to_string(),
    }
}

pub fn render_plain(message: &str, metadata: Option<&Value>) -> String {
    match metadata {
        Some(metadata) => format!("{message}\n{}", pretty_metadata(metadata)),
        None => message.to_string(),
    }
}

/// All three renditions of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedViews {
    pub raw: String,
    pub diff: String,
    pub plain: String,
}

impl RenderedViews {
    pub fn render(category: LogCategory, message: &str, metadata: Option<&Value>) -> Self {
        Self {
            raw: message.to_string(),
            diff: render_diff(category, message),
            plain: render_plain(message, metadata),
        }
    }
}
