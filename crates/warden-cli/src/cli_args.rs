use std::path::PathBuf;

use clap::{ArgAction, Parser};
use serde_json::Value;
use warden_logs::LogCategory;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_category(value: &str) -> Result<LogCategory, String> {
    LogCategory::parse(value).ok_or_else(|| {
        format!("unknown category '{value}', expected ok|info|warn|error|debug|fatal|verbose")
    })
}

fn parse_metadata(value: &str) -> Result<Value, String> {
    serde_json::from_str(value).map_err(|error| format!("metadata must be JSON: {error}"))
}

#[derive(Debug, Parser)]
#[command(
    name = "warden-log",
    about = "Emit one structured log record through the Warden logging pipeline",
    version
)]
pub struct Cli {
    #[arg(help = "Log message. Multi-line messages are rendered line by line")]
    pub message: String,

    #[arg(
        long,
        default_value = "info",
        value_parser = parse_category,
        help = "Record category: ok, info, warn, error, debug, fatal or verbose"
    )]
    pub category: LogCategory,

    #[arg(
        long,
        value_parser = parse_metadata,
        help = "Optional JSON metadata attached to the record"
    )]
    pub metadata: Option<Value>,

    #[arg(
        long = "config",
        env = "WARDEN_LOGS_CONFIG",
        help = "TOML file with a [logs] table. Flags below override its values"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "max-verbosity",
        env = "WARDEN_LOG_MAX_VERBOSITY",
        help = "Most verbose severity emitted: FATAL, ERROR, INFO, VERBOSE or DEBUG"
    )]
    pub max_verbosity: Option<String>,

    #[arg(
        long = "retry-limit",
        env = "WARDEN_LOG_RETRY_LIMIT",
        help = "Extra persistence attempts after the first failure"
    )]
    pub retry_limit: Option<u32>,

    #[arg(
        long,
        env = "WARDEN_LOG_CONCURRENCY",
        value_parser = parse_positive_usize,
        help = "Maximum concurrent persistence workers"
    )]
    pub concurrency: Option<usize>,

    #[arg(
        long = "retry-delay-ms",
        env = "WARDEN_LOG_RETRY_DELAY_MS",
        help = "Fixed delay between persistence attempts"
    )]
    pub retry_delay_ms: Option<u64>,

    #[arg(
        long = "queue-capacity",
        env = "WARDEN_LOG_QUEUE_CAPACITY",
        help = "Pending persistence entries before new ones are rejected (0 = unbounded)"
    )]
    pub queue_capacity: Option<usize>,

    #[arg(
        long,
        env = "WARDEN_REVISION",
        help = "Build revision attached to record metadata"
    )]
    pub revision: Option<String>,

    #[arg(
        long = "store-url",
        env = "SUPABASE_URL",
        requires = "store_key",
        conflicts_with = "store_file",
        help = "Base URL of the PostgREST endpoint that owns the logs table"
    )]
    pub store_url: Option<String>,

    #[arg(
        long = "store-key",
        env = "SUPABASE_KEY",
        hide_env_values = true,
        help = "Service key sent as apikey and bearer token"
    )]
    pub store_key: Option<String>,

    #[arg(
        long = "store-file",
        env = "WARDEN_LOG_STORE_FILE",
        help = "Append records to a rotating JSONL file instead of a remote table"
    )]
    pub store_file: Option<PathBuf>,

    #[arg(
        long = "post-comment",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        requires_all = ["github_repo", "issue_number", "github_token"],
        help = "Also post the rendered record as an issue comment"
    )]
    pub post_comment: bool,

    #[arg(
        long = "github-repo",
        env = "GITHUB_REPOSITORY",
        help = "Repository in owner/repo format"
    )]
    pub github_repo: Option<String>,

    #[arg(long = "issue-number", help = "Issue or pull request number to comment on")]
    pub issue_number: Option<u64>,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "Token used for issue comments"
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "github-api-base",
        env = "WARDEN_GITHUB_API_BASE",
        default_value = warden_github::DEFAULT_GITHUB_API_BASE,
        help = "GitHub REST API base URL"
    )]
    pub github_api_base: String,

    #[arg(
        long = "flush-timeout-ms",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "How long to wait for pending persistence before exiting"
    )]
    pub flush_timeout_ms: u64,
}
