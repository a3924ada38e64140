use serde_json::Value;

/// Truncates error payloads so log lines stay bounded.
pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Extracts the `message` field of a GitHub error body.
///
/// Returns `None` for bodies that are not JSON objects or carry no usable
/// message; those are reported as failures of unrecognized shape.
pub fn extract_github_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(body).ok()?;
    parsed
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

pub fn is_rate_limit_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("rate limit")
}

pub fn is_not_authorized_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("not authorized")
}

/// Derives the browser URL of an issue from the configured web base.
pub fn issue_web_url(web_base: &str, owner: &str, repo: &str, issue_number: u64) -> String {
    format!(
        "{}/{owner}/{repo}/issues/{issue_number}",
        web_base.trim_end_matches('/')
    )
}

pub fn comment_web_url(
    web_base: &str,
    owner: &str,
    repo: &str,
    issue_number: u64,
    comment_id: u64,
) -> String {
    format!(
        "{}#issuecomment-{comment_id}",
        issue_web_url(web_base, owner, repo, issue_number)
    )
}
