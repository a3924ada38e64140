//! GitHub REST and GraphQL client scoped to one repository.
//!
//! Every call resolves its bearer token first; a credential failure aborts the
//! call before any request is sent. Calls are single-shot: retries belong to
//! [`crate::backoff::BackoffPolicy`] at the call site.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use tau_forum_issues::github_transport_helpers::{extract_github_error_message, truncate_for_error};
use tau_forum_issues::github_types::{
    GithubAuthenticatedApp, GithubCommentCreateResponse, GithubInstallation, GithubIssue,
    GithubIssueComment, GithubIssueCreateResponse, GithubIssueState, GithubRateLimitResponse,
    GithubRateLimitWindow, GraphqlResponse,
};

use crate::app_credentials::TrackerCredentials;
use crate::sync_config::RepoRef;
use crate::tracker_error::TrackerError;

const LIST_PAGE_SIZE: usize = 100;
const DELETE_ISSUE_MUTATION: &str = "mutation DeleteIssue($issueId: ID!) { deleteIssue(input: { issueId: $issueId }) { clientMutationId } }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthScope {
    App,
    Installation,
}

#[derive(Clone)]
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    graphql_url: String,
    repo: RepoRef,
    installation_id: Option<u64>,
    credentials: Arc<dyn TrackerCredentials>,
}

impl GithubApiClient {
    pub fn new(
        api_base: String,
        graphql_url: String,
        repo: RepoRef,
        credentials: Arc<dyn TrackerCredentials>,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Tau-forum-issues-sync"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            graphql_url: graphql_url.trim().to_string(),
            repo,
            installation_id: None,
            credentials,
        })
    }

    /// Sets the installation used by the permission lookup.
    pub fn with_installation_id(mut self, installation_id: u64) -> Self {
        self.installation_id = Some(installation_id);
        self
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub async fn authenticated_app(&self) -> Result<GithubAuthenticatedApp, TrackerError> {
        self.request_json("get authenticated app", AuthScope::App, |http| {
            http.get(format!("{}/app", self.api_base))
        })
        .await
    }

    pub async fn installation(&self) -> Result<GithubInstallation, TrackerError> {
        let installation_id = self.installation_id.ok_or_else(|| {
            TrackerError::NoClient("github installation id is not configured".to_string())
        })?;
        self.request_json("get installation", AuthScope::App, |http| {
            http.get(format!(
                "{}/app/installations/{installation_id}",
                self.api_base
            ))
        })
        .await
    }

    pub async fn rate_limit(&self) -> Result<GithubRateLimitWindow, TrackerError> {
        let response: GithubRateLimitResponse = self
            .request_json("get rate limit", AuthScope::Installation, |http| {
                http.get(format!("{}/rate_limit", self.api_base))
            })
            .await?;
        Ok(response.rate)
    }

    pub async fn create_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<GithubIssueCreateResponse, TrackerError> {
        let payload = json!({ "title": title, "body": body, "labels": labels });
        self.request_json("create issue", AuthScope::Installation, |http| {
            http.post(format!(
                "{}/repos/{}/{}/issues",
                self.api_base, self.repo.owner, self.repo.name
            ))
            .json(&payload)
        })
        .await
    }

    pub async fn update_issue_state(
        &self,
        issue_number: u64,
        state: GithubIssueState,
    ) -> Result<(), TrackerError> {
        let payload = json!({ "state": state.as_str() });
        let _: IgnoredAny = self
            .request_json("update issue state", AuthScope::Installation, |http| {
                http.patch(format!(
                    "{}/repos/{}/{}/issues/{issue_number}",
                    self.api_base, self.repo.owner, self.repo.name
                ))
                .json(&payload)
            })
            .await?;
        Ok(())
    }

    pub async fn lock_issue(&self, issue_number: u64) -> Result<(), TrackerError> {
        self.request_no_content("lock issue", AuthScope::Installation, |http| {
            http.put(format!(
                "{}/repos/{}/{}/issues/{issue_number}/lock",
                self.api_base, self.repo.owner, self.repo.name
            ))
            .json(&json!({}))
        })
        .await
    }

    pub async fn unlock_issue(&self, issue_number: u64) -> Result<(), TrackerError> {
        self.request_no_content("unlock issue", AuthScope::Installation, |http| {
            http.delete(format!(
                "{}/repos/{}/{}/issues/{issue_number}/lock",
                self.api_base, self.repo.owner, self.repo.name
            ))
        })
        .await
    }

    pub async fn create_issue_comment(
        &self,
        issue_number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse, TrackerError> {
        let payload = json!({ "body": body });
        self.request_json("create issue comment", AuthScope::Installation, |http| {
            http.post(format!(
                "{}/repos/{}/{}/issues/{issue_number}/comments",
                self.api_base, self.repo.owner, self.repo.name
            ))
            .json(&payload)
        })
        .await
    }

    pub async fn delete_issue_comment(&self, comment_id: u64) -> Result<(), TrackerError> {
        self.request_no_content("delete issue comment", AuthScope::Installation, |http| {
            http.delete(format!(
                "{}/repos/{}/{}/issues/comments/{comment_id}",
                self.api_base, self.repo.owner, self.repo.name
            ))
        })
        .await
    }

    /// Lists every issue in the repository regardless of state, skipping pull requests.
    pub async fn list_repo_issues(&self) -> Result<Vec<GithubIssue>, TrackerError> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssue> = self
                .request_json("list issues", AuthScope::Installation, |http| {
                    http.get(format!(
                        "{}/repos/{}/{}/issues",
                        self.api_base, self.repo.owner, self.repo.name
                    ))
                    .query(&[
                        ("state", "all"),
                        ("sort", "created"),
                        ("direction", "asc"),
                        ("per_page", "100"),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(
                chunk
                    .into_iter()
                    .filter(|issue| issue.pull_request.is_none()),
            );
            if chunk_len < LIST_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    /// Lists every issue comment in the repository.
    pub async fn list_repo_comments(&self) -> Result<Vec<GithubIssueComment>, TrackerError> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssueComment> = self
                .request_json("list issue comments", AuthScope::Installation, |http| {
                    http.get(format!(
                        "{}/repos/{}/{}/issues/comments",
                        self.api_base, self.repo.owner, self.repo.name
                    ))
                    .query(&[
                        ("sort", "created"),
                        ("direction", "asc"),
                        ("per_page", "100"),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < LIST_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    /// Deletes an issue through the GraphQL `deleteIssue` mutation.
    pub async fn delete_issue(&self, node_id: &str) -> Result<(), TrackerError> {
        let operation = "delete issue";
        let payload = json!({
            "query": DELETE_ISSUE_MUTATION,
            "variables": { "issueId": node_id },
        });
        let response: GraphqlResponse = self
            .request_json(operation, AuthScope::Installation, |http| {
                http.post(self.graphql_url.as_str()).json(&payload)
            })
            .await?;
        let messages = response
            .errors
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.message)
            .filter(|message| !message.trim().is_empty())
            .collect::<Vec<_>>();
        if !messages.is_empty() {
            return Err(TrackerError::Graphql {
                operation: operation.to_string(),
                message: messages.join("; "),
            });
        }
        Ok(())
    }

    async fn bearer_token(&self, scope: AuthScope) -> Result<String, TrackerError> {
        match scope {
            AuthScope::App => self.credentials.app_bearer(),
            AuthScope::Installation => {
                self.credentials
                    .installation_token(&self.http, &self.api_base)
                    .await
            }
        }
    }

    async fn send<F>(
        &self,
        operation: &str,
        scope: AuthScope,
        request_builder: F,
    ) -> Result<String, TrackerError>
    where
        F: FnOnce(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let token = self.bearer_token(scope).await?;
        let response = request_builder(&self.http)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| TrackerError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| TrackerError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        if status.is_success() {
            return Ok(body);
        }
        Err(match extract_github_error_message(&body) {
            Some(message) => TrackerError::Api {
                operation: operation.to_string(),
                status: status.as_u16(),
                message,
            },
            None => TrackerError::Unrecognized {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: truncate_for_error(&body, 800),
            },
        })
    }

    async fn request_json<T, F>(
        &self,
        operation: &str,
        scope: AuthScope,
        request_builder: F,
    ) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
        F: FnOnce(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let body = self.send(operation, scope, request_builder).await?;
        serde_json::from_str::<T>(&body).map_err(|source| TrackerError::Decode {
            operation: operation.to_string(),
            source,
        })
    }

    async fn request_no_content<F>(
        &self,
        operation: &str,
        scope: AuthScope,
        request_builder: F,
    ) -> Result<(), TrackerError>
    where
        F: FnOnce(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        self.send(operation, scope, request_builder).await?;
        Ok(())
    }
}
