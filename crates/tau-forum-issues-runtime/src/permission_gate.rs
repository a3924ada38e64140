use serde::Serialize;
use tau_forum_issues::github_types::GithubInstallation;

use crate::github_api_client::GithubApiClient;
use crate::tracker_error::TrackerError;

pub const INSUFFICIENT_PERMISSIONS_MESSAGE: &str = "github app lacks required permissions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Outcome of inspecting the installation's granted permissions.
pub struct PermissionReport {
    pub granted: bool,
    pub issues: Option<String>,
    pub administration: Option<String>,
}

fn grants_write(level: Option<&str>) -> bool {
    matches!(level, Some("write") | Some("admin"))
}

/// Evaluates the permission map: issue write access is required, administration
/// is reported only.
pub fn evaluate_installation_permissions(installation: &GithubInstallation) -> PermissionReport {
    let issues = installation.permissions.get("issues").cloned();
    let administration = installation.permissions.get("administration").cloned();
    PermissionReport {
        granted: grants_write(issues.as_deref()),
        issues,
        administration,
    }
}

/// Queries the installation and reports whether destructive issue operations are allowed.
pub async fn check_permissions(client: &GithubApiClient) -> Result<PermissionReport, TrackerError> {
    let installation = client.installation().await?;
    let report = evaluate_installation_permissions(&installation);
    tracing::debug!(
        granted = report.granted,
        issues = report.issues.as_deref().unwrap_or("none"),
        administration = report.administration.as_deref().unwrap_or("none"),
        "github installation permissions checked"
    );
    Ok(report)
}
