use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use warden_logs::{LogStore, LogStoreError, QueueEntry};

const LOGS_TABLE_PATH: &str = "rest/v1/logs";
const MAX_ERROR_BODY_CHARS: usize = 800;

/// Connection settings for a PostgREST-compatible `logs` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestStoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Inserts one row per record into the `logs` table.
///
/// No retries happen here: the dispatch queue owns the retry policy.
#[derive(Clone)]
pub struct RestLogStore {
    http: reqwest::Client,
    endpoint: String,
}

impl RestLogStore {
    pub fn new(config: &RestStoreConfig) -> Result<Self> {
        let key = config.api_key.trim();
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "apikey",
            reqwest::header::HeaderValue::from_str(key).context("invalid store api key header")?,
        );
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {key}"))
                .context("invalid store authorization header")?,
        );
        headers.insert(
            "prefer",
            reqwest::header::HeaderValue::from_static("return=minimal"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create log store client")?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/{LOGS_TABLE_PATH}",
                config.base_url.trim_end_matches('/')
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LogStore for RestLogStore {
    async fn insert_log(&self, entry: &QueueEntry) -> Result<(), LogStoreError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(entry)
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(endpoint = %self.endpoint, %error, "log row insert not sent");
                LogStoreError::Transport(error.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            level = entry.level.as_str(),
            "log row insert rejected"
        );
        Err(LogStoreError::Rejected {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }
}
