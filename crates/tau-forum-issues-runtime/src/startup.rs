use serde::Serialize;
use tau_forum_issues::github_types::GithubRateLimitWindow;

use crate::github_api_client::GithubApiClient;
use crate::permission_gate::{check_permissions, PermissionReport};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Result of the one-shot startup self-check.
pub struct Readiness {
    pub authenticated: bool,
    pub app_slug: Option<String>,
    pub permissions: Option<PermissionReport>,
    pub rate_limit: Option<GithubRateLimitWindow>,
    pub errors: Vec<String>,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.authenticated
            && self
                .permissions
                .as_ref()
                .is_some_and(|report| report.granted)
    }
}

/// Verifies app authentication, then reports installation permissions and the
/// current rate-limit window. Failures are logged and recorded, never fatal.
pub async fn initialize(client: &GithubApiClient) -> Readiness {
    let mut readiness = Readiness::default();
    match client.authenticated_app().await {
        Ok(app) => {
            readiness.authenticated = true;
            readiness.app_slug = app.slug.clone();
            tracing::info!(
                app_id = app.id,
                app_slug = app.slug.as_deref().unwrap_or("unknown"),
                repo = client.repo().as_slug().as_str(),
                "github app authenticated"
            );
        }
        Err(error) => {
            tracing::error!(error = %error, "github app authentication failed");
            readiness.errors.push(error.to_string());
            return readiness;
        }
    }

    match check_permissions(client).await {
        Ok(report) => {
            if report.granted {
                tracing::info!(
                    issues = report.issues.as_deref().unwrap_or("none"),
                    "github installation permissions verified"
                );
            } else {
                tracing::error!(
                    issues = report.issues.as_deref().unwrap_or("none"),
                    administration = report.administration.as_deref().unwrap_or("none"),
                    "github app lacks required permissions"
                );
            }
            readiness.permissions = Some(report);
        }
        Err(error) => {
            tracing::error!(error = %error, "github permission check failed");
            readiness.errors.push(error.to_string());
        }
    }

    match client.rate_limit().await {
        Ok(window) => {
            tracing::info!(
                limit = window.limit,
                remaining = window.remaining,
                reset = window.reset,
                "github rate limit"
            );
            readiness.rate_limit = Some(window);
        }
        Err(error) => {
            tracing::warn!(error = %error, "github rate limit lookup failed");
            readiness.errors.push(error.to_string());
        }
    }
    readiness
}
