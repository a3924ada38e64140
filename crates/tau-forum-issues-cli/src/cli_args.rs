use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tau_forum_issues_runtime::sync_config::{
    DEFAULT_GITHUB_API_BASE, DEFAULT_GITHUB_GRAPHQL_URL, DEFAULT_GITHUB_WEB_BASE,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS,
};

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

#[derive(Debug, Parser)]
#[command(
    name = "tau-forum-issues",
    about = "Mirror Discord forum threads to GitHub issues",
    version
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) github: GithubArgs,

    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Verify app authentication, installation permissions, and rate limit.
    Check {
        #[arg(long = "json", default_value_t = false, help = "Emit the readiness report as pretty JSON")]
        json: bool,
    },
    /// Rebuild thread records from the issues and comments in the repository.
    Scan {
        #[arg(long = "json", default_value_t = false, help = "Emit recovered threads as pretty JSON")]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub(crate) struct GithubArgs {
    #[arg(
        long = "github-app-id",
        env = "TAU_FORUM_GITHUB_APP_ID",
        value_parser = parse_positive_u64,
        help = "GitHub App id"
    )]
    pub(crate) github_app_id: u64,

    #[arg(
        long = "github-private-key",
        env = "TAU_FORUM_GITHUB_PRIVATE_KEY",
        hide_env_values = true,
        conflicts_with = "github_private_key_path",
        help = "GitHub App RSA private key in PEM format"
    )]
    pub(crate) github_private_key: Option<String>,

    #[arg(
        long = "github-private-key-path",
        env = "TAU_FORUM_GITHUB_PRIVATE_KEY_PATH",
        help = "Path to the GitHub App RSA private key PEM file"
    )]
    pub(crate) github_private_key_path: Option<PathBuf>,

    #[arg(
        long = "github-installation-id",
        env = "TAU_FORUM_GITHUB_INSTALLATION_ID",
        value_parser = parse_positive_u64,
        help = "GitHub App installation id for the mirrored repository"
    )]
    pub(crate) github_installation_id: u64,

    #[arg(
        long = "github-client-id",
        env = "TAU_FORUM_GITHUB_CLIENT_ID",
        help = "GitHub App client id; used as the JWT issuer when set"
    )]
    pub(crate) github_client_id: Option<String>,

    #[arg(
        long = "github-client-secret",
        env = "TAU_FORUM_GITHUB_CLIENT_SECRET",
        hide_env_values = true,
        help = "GitHub App client secret"
    )]
    pub(crate) github_client_secret: Option<String>,

    #[arg(
        long = "github-repo",
        env = "TAU_FORUM_GITHUB_REPO",
        help = "GitHub repository in owner/repo format that receives mirrored threads"
    )]
    pub(crate) github_repo: String,

    #[arg(
        long = "github-additional-labels",
        env = "TAU_FORUM_GITHUB_ADDITIONAL_LABELS",
        default_value = "",
        help = "Comma separated labels added to every created issue"
    )]
    pub(crate) github_additional_labels: String,

    #[arg(
        long = "github-api-base",
        env = "TAU_FORUM_GITHUB_API_BASE",
        default_value = DEFAULT_GITHUB_API_BASE,
        help = "GitHub API base URL"
    )]
    pub(crate) github_api_base: String,

    #[arg(
        long = "github-graphql-url",
        env = "TAU_FORUM_GITHUB_GRAPHQL_URL",
        default_value = DEFAULT_GITHUB_GRAPHQL_URL,
        help = "GitHub GraphQL endpoint"
    )]
    pub(crate) github_graphql_url: String,

    #[arg(
        long = "github-web-base",
        env = "TAU_FORUM_GITHUB_WEB_BASE",
        default_value = DEFAULT_GITHUB_WEB_BASE,
        help = "GitHub web base URL used for logged issue links"
    )]
    pub(crate) github_web_base: String,

    #[arg(
        long = "request-timeout-ms",
        env = "TAU_FORUM_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "HTTP timeout for GitHub API requests in milliseconds"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "TAU_FORUM_RETRY_MAX_ATTEMPTS",
        default_value_t = DEFAULT_RETRY_MAX_ATTEMPTS,
        value_parser = parse_positive_usize,
        help = "Maximum attempts for rate-limited issue deletes"
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "TAU_FORUM_RETRY_BASE_DELAY_MS",
        default_value_t = DEFAULT_RETRY_BASE_DELAY_MS,
        help = "Base backoff delay in milliseconds; doubled per attempt"
    )]
    pub(crate) retry_base_delay_ms: u64,
}
