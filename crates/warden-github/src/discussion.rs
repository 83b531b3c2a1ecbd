use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use warden_logs::ThreadSink;

use crate::github_api_client::GithubApiClient;

/// Issue or pull request that log comments are posted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionContext {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
}

impl DiscussionContext {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, issue_number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            issue_number,
        }
    }

    /// Parses an `owner/repo` slug.
    pub fn parse(slug: &str, issue_number: u64) -> Result<Self> {
        let trimmed = slug.trim();
        let (owner, repo) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid repository '{slug}', expected owner/repo"))?;
        let owner = owner.trim();
        let repo = repo.trim();
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            bail!("invalid repository '{slug}', expected owner/repo");
        }
        if issue_number == 0 {
            bail!("invalid issue number 0 for {owner}/{repo}");
        }
        Ok(Self::new(owner, repo, issue_number))
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repo, self.issue_number)
    }
}

/// Posts rendered log records as comments on one issue.
#[derive(Clone)]
pub struct GithubThreadSink {
    client: GithubApiClient,
    context: DiscussionContext,
}

impl GithubThreadSink {
    pub fn new(client: GithubApiClient, context: DiscussionContext) -> Self {
        Self { client, context }
    }

    pub fn context(&self) -> &DiscussionContext {
        &self.context
    }
}

#[async_trait]
impl ThreadSink for GithubThreadSink {
    async fn post_comment(&self, body: &str) -> Result<()> {
        let created = self.client.create_issue_comment(&self.context, body).await?;
        tracing::debug!(
            discussion = self.context.as_slug(),
            comment_id = created.id,
            "posted log comment"
        );
        Ok(())
    }
}
