use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubIssueLabel` used across Tau forum sync components.
pub struct GithubIssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `GithubIssueState` values.
pub enum GithubIssueState {
    Open,
    Closed,
}

impl GithubIssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Issue row returned by the repository issue listing.
pub struct GithubIssue {
    pub id: u64,
    pub node_id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: GithubIssueState,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Comment row returned by the repository comment listing.
pub struct GithubIssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub issue_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// Public struct `GithubIssueCreateResponse` used across Tau forum sync components.
pub struct GithubIssueCreateResponse {
    pub id: u64,
    pub number: u64,
    pub node_id: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// Public struct `GithubCommentCreateResponse` used across Tau forum sync components.
pub struct GithubCommentCreateResponse {
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Installation record including the permission map granted to the app.
pub struct GithubInstallation {
    pub id: u64,
    #[serde(default)]
    pub app_slug: Option<String>,
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubAuthenticatedApp` used across Tau forum sync components.
pub struct GithubAuthenticatedApp {
    pub id: u64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
/// Public struct `GithubRateLimitWindow` used across Tau forum sync components.
pub struct GithubRateLimitWindow {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
    #[serde(default)]
    pub used: u64,
}

#[derive(Debug, Clone, Deserialize)]
/// Public struct `GithubRateLimitResponse` used across Tau forum sync components.
pub struct GithubRateLimitResponse {
    pub rate: GithubRateLimitWindow,
}

#[derive(Debug, Clone, Deserialize)]
/// Installation access token issued by `POST /app/installations/{id}/access_tokens`.
pub struct GithubInstallationToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// Public struct `GraphqlErrorEntry` used across Tau forum sync components.
pub struct GraphqlErrorEntry {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
/// GraphQL envelope; `errors` may accompany an HTTP 200.
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlErrorEntry>>,
}
