//! GitHub issue-comment transport for Warden log records.

pub mod discussion;
pub mod github_api_client;
pub mod retry_policy;

pub use discussion::{DiscussionContext, GithubThreadSink};
pub use github_api_client::{
    GithubApiClient, GithubClientConfig, GithubCommentCreateResponse, DEFAULT_GITHUB_API_BASE,
};
pub use retry_policy::{CommentRetryPolicy, RetryVerdict};
