use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::json;
use warden_core::current_unix_timestamp;

use crate::discussion::DiscussionContext;
use crate::retry_policy::{
    body_snippet, classify_status, is_transient_transport_error, CommentRetryPolicy, RetryVerdict,
};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubCommentCreateResponse {
    pub id: u64,
    pub html_url: Option<String>,
}

/// Retry settings and identity for [`GithubApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubClientConfig {
    pub api_base: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl GithubClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            token: token.into(),
            request_timeout_ms: 10_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Clone)]
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    retry: CommentRetryPolicy,
}

impl GithubApiClient {
    pub fn new(config: &GithubClientConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("warden-logs"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", config.token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retry: CommentRetryPolicy::new(config.retry_max_attempts, config.retry_base_delay_ms),
        })
    }

    /// Posts `body` on the issue, retrying rate limits, 5xx responses and
    /// transient connection failures within the configured attempt budget.
    pub async fn create_issue_comment(
        &self,
        context: &DiscussionContext,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, context.owner, context.repo, context.issue_number
        );
        let payload = json!({ "body": body });
        let thread = context.as_slug();

        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let sent = self
                .http
                .post(&url)
                .header("x-warden-retry-attempt", (attempt - 1).to_string())
                .json(&payload)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(error) => {
                    if self.retry.allows_another(attempt) && is_transient_transport_error(&error) {
                        tracing::debug!(%thread, attempt, %error, "retrying log comment post");
                        tokio::time::sleep(self.retry.backoff(attempt, None)).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("posting log comment to {thread} failed"));
                }
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<GithubCommentCreateResponse>()
                    .await
                    .with_context(|| format!("unreadable comment response from {thread}"));
            }

            let verdict = classify_status(status, response.headers(), current_unix_timestamp());
            let body = response.text().await.unwrap_or_default();
            match verdict {
                RetryVerdict::Retry(hint) if self.retry.allows_another(attempt) => {
                    tracing::debug!(
                        %thread,
                        attempt,
                        status = status.as_u16(),
                        "retrying log comment post"
                    );
                    tokio::time::sleep(self.retry.backoff(attempt, hint)).await;
                }
                _ => {
                    return Err(anyhow!(
                        "posting log comment to {thread} failed with status {}: {}",
                        status.as_u16(),
                        body_snippet(&body)
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GithubApiClient, GithubClientConfig};
    use crate::discussion::DiscussionContext;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, attempts: usize) -> GithubApiClient {
        let config = GithubClientConfig {
            api_base: server.base_url(),
            retry_max_attempts: attempts,
            retry_base_delay_ms: 1,
            request_timeout_ms: 2_000,
            ..GithubClientConfig::new("token")
        };
        GithubApiClient::new(&config).expect("client")
    }

    #[tokio::test]
    async fn functional_create_issue_comment_posts_body_with_auth_headers() {
        let server = MockServer::start();
        let comment = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/owner/repo/issues/7/comments")
                .header("authorization", "Bearer token")
                .header("x-warden-retry-attempt", "0")
                .json_body(json!({"body": "```diff\n+ ok\n```"}));
            then.status(201)
                .json_body(json!({"id": 11, "html_url": "https://example.test/c/11"}));
        });

        let context = DiscussionContext::new("owner", "repo", 7);
        let response = client(&server, 3)
            .create_issue_comment(&context, "```diff\n+ ok\n```")
            .await
            .expect("comment created");
        assert_eq!(response.id, 11);
        assert_eq!(response.html_url.as_deref(), Some("https://example.test/c/11"));
        assert_eq!(comment.calls(), 1);
    }

    #[tokio::test]
    async fn integration_create_issue_comment_retries_rate_limits() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/owner/repo/issues/7/comments")
                .header("x-warden-retry-attempt", "0");
            then.status(429)
                .header("retry-after", "0")
                .body("rate limit");
        });
        let second = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/owner/repo/issues/7/comments")
                .header("x-warden-retry-attempt", "1");
            then.status(201).json_body(json!({"id": 12}));
        });

        let context = DiscussionContext::new("owner", "repo", 7);
        let response = client(&server, 3)
            .create_issue_comment(&context, "body")
            .await
            .expect("comment should eventually succeed");
        assert_eq!(response.id, 12);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn regression_client_errors_are_not_retried() {
        let server = MockServer::start();
        let forbidden = server.mock(|when, then| {
            when.method(POST).path("/repos/owner/repo/issues/7/comments");
            then.status(403).body("Resource not accessible by integration");
        });

        let context = DiscussionContext::new("owner", "repo", 7);
        let error = client(&server, 3)
            .create_issue_comment(&context, "body")
            .await
            .expect_err("403 fails");
        let message = format!("{error:#}");
        assert!(message.contains("status 403"));
        assert!(message.contains("Resource not accessible"));
        assert_eq!(forbidden.calls(), 1);
    }

    #[tokio::test]
    async fn regression_forbidden_rate_limit_is_retried_until_reset() {
        let server = MockServer::start();
        let limited = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/owner/repo/issues/7/comments")
                .header("x-warden-retry-attempt", "0");
            then.status(403)
                .header("x-ratelimit-remaining", "0")
                .header("x-ratelimit-reset", "1")
                .body("API rate limit exceeded");
        });
        let accepted = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/owner/repo/issues/7/comments")
                .header("x-warden-retry-attempt", "1");
            then.status(201).json_body(json!({"id": 13}));
        });

        let context = DiscussionContext::new("owner", "repo", 7);
        let response = client(&server, 2)
            .create_issue_comment(&context, "body")
            .await
            .expect("rate limit clears");
        assert_eq!(response.id, 13);
        assert_eq!(limited.calls(), 1);
        assert_eq!(accepted.calls(), 1);
    }

    #[tokio::test]
    async fn regression_retry_budget_exhaustion_reports_last_status() {
        let server = MockServer::start();
        let unavailable = server.mock(|when, then| {
            when.method(POST).path("/repos/owner/repo/issues/7/comments");
            then.status(502).body("bad gateway");
        });

        let context = DiscussionContext::new("owner", "repo", 7);
        let error = client(&server, 2)
            .create_issue_comment(&context, "body")
            .await
            .expect_err("502 persists");
        let message = format!("{error:#}");
        assert!(message.contains("owner/repo#7"));
        assert!(message.contains("status 502: bad gateway"));
        assert_eq!(unavailable.calls(), 2);
    }
}
