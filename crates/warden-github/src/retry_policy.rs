//! When a failed issue-comment post is worth another attempt, and how long to wait.
//!
//! GitHub signals secondary rate limits with either `429` or a `403` carrying
//! `x-ratelimit-remaining: 0` / `retry-after`. Those are retried; every other
//! client error is final.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const BODY_SNIPPET_CHARS: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Try again, honoring the server's wait hint when it gave one.
    Retry(Option<Duration>),
    GiveUp,
}

/// Attempt budget and backoff for comment posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentRetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl CommentRetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms.max(1)),
        }
    }

    /// `attempt` is 1-based: the attempt that just failed.
    pub fn allows_another(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    /// Doubles from the base delay per failed attempt. A server hint replaces
    /// the doubling but is held between the base delay and the 30s cap.
    pub fn backoff(&self, attempt: usize, hint: Option<Duration>) -> Duration {
        let delay = match hint {
            Some(hint) => hint.max(self.base_delay),
            None => {
                let exponent = u32::try_from(attempt.saturating_sub(1).min(16)).unwrap_or(16);
                self.base_delay.saturating_mul(2_u32.saturating_pow(exponent))
            }
        };
        delay.min(MAX_BACKOFF)
    }
}

/// Classifies a non-success response. `now_unix` anchors `x-ratelimit-reset`.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, now_unix: u64) -> RetryVerdict {
    if status.is_server_error() {
        return RetryVerdict::Retry(retry_after(headers));
    }
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (header_u64(headers, "x-ratelimit-remaining") == Some(0)
                || headers.contains_key("retry-after")));
    if !rate_limited {
        return RetryVerdict::GiveUp;
    }
    let hint = retry_after(headers).or_else(|| {
        header_u64(headers, "x-ratelimit-reset")
            .map(|reset| Duration::from_secs(reset.saturating_sub(now_unix)))
    });
    RetryVerdict::Retry(hint)
}

/// Timeouts and refused connections; the request never reached GitHub.
pub fn is_transient_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Response body trimmed for inclusion in an error message.
pub fn body_snippet(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_u64(headers, "retry-after").map(Duration::from_secs)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
