//! Startup configuration for the forum sync runtime.
//!
//! Everything the runtime reads from the operator is resolved once into
//! [`SyncConfig`]; business logic never consults the process environment.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tau_forum_issues::forum_labels::parse_additional_labels;

use crate::app_credentials::GithubAppCredentials;
use crate::backoff::BackoffPolicy;
use crate::github_api_client::GithubApiClient;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_GITHUB_WEB_BASE: &str = "https://github.com";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The single `owner/repo` pair every tracker call is scoped to.
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid --github-repo '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid --github-repo '{raw}', expected owner/repo");
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Clone)]
/// GitHub App identity used to mint installation tokens.
pub struct AppAuthConfig {
    pub app_id: u64,
    pub installation_id: u64,
    pub private_key_pem: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl fmt::Debug for AppAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppAuthConfig")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key_pem", &"<redacted>")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone)]
/// Runtime configuration for the forum sync engine and reconciliation scanner.
pub struct SyncConfig {
    pub app: AppAuthConfig,
    pub repo: RepoRef,
    pub additional_labels: Vec<String>,
    pub api_base: String,
    pub graphql_url: String,
    pub web_base: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl SyncConfig {
    /// Builds a config with default endpoints; fails on a malformed repo slug.
    pub fn new(app: AppAuthConfig, repo_slug: &str, additional_labels: &str) -> Result<Self> {
        Ok(Self {
            app,
            repo: RepoRef::parse(repo_slug)?,
            additional_labels: parse_additional_labels(additional_labels),
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            graphql_url: DEFAULT_GITHUB_GRAPHQL_URL.to_string(),
            web_base: DEFAULT_GITHUB_WEB_BASE.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        })
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.retry_max_attempts, self.retry_base_delay_ms)
    }

    /// Creates the app-authenticated GitHub client; an unreadable private key
    /// is a startup error.
    pub fn build_client(&self) -> Result<GithubApiClient> {
        let credentials = GithubAppCredentials::new(&self.app)?;
        let client = GithubApiClient::new(
            self.api_base.clone(),
            self.graphql_url.clone(),
            self.repo.clone(),
            Arc::new(credentials),
            self.request_timeout_ms,
        )?;
        Ok(client.with_installation_id(self.app.installation_id))
    }
}
