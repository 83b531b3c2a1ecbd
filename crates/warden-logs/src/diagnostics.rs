use std::panic::Location;

use serde_json::{Map, Value};

/// Build identifier baked in at compile time, when the build exported one.
pub const BUILD_REVISION: Option<&str> = option_env!("WARDEN_COMMIT_HASH");

const REVISION_CHARS: usize = 7;

/// Best-effort call-site label for `location`, e.g. `src/handlers/start.rs:41:9`.
pub fn caller_label(location: &Location<'_>) -> String {
    format!(
        "{}:{}:{}",
        location.file(),
        location.line(),
        location.column()
    )
}

/// Truncates a revision to its short form. Blank revisions count as unset.
pub fn short_revision(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(REVISION_CHARS).collect())
}

/// Attaches `caller` and `revision` to record metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEnricher {
    revision: Option<String>,
}

impl DiagnosticEnricher {
    pub fn new(revision: Option<&str>) -> Self {
        Self {
            revision: short_revision(revision),
        }
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Objects are extended in place; any other value is wrapped under `message`.
    /// Existing `caller`/`revision` keys are overwritten, so enriching twice keeps
    /// one value per key (the latest).
    pub fn enrich(&self, metadata: Option<Value>, caller: Option<&str>) -> Map<String, Value> {
        let mut enriched = match metadata {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(object)) => object,
            Some(other) => {
                let mut wrapped = Map::new();
                wrapped.insert("message".to_string(), other);
                wrapped
            }
        };

        if let Some(caller) = caller {
            enriched.insert("caller".to_string(), Value::String(caller.to_string()));
        }
        enriched.insert(
            "revision".to_string(),
            self.revision
                .as_ref()
                .map(|revision| Value::String(revision.clone()))
                .unwrap_or(Value::Null),
        );
        enriched
    }
}
