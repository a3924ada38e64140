//! Rebuilds thread records from the tracker side.
//!
//! Issues and comments carry the identity link of their Discord origin; the
//! scanner decodes those links and joins comments to threads by channel id.

use tau_forum_issues::forum_labels::{resolve_tag_ids, ForumTag};
use tau_forum_issues::github_types::{GithubIssue, GithubIssueComment, GithubIssueState};
use tau_forum_issues::identity_link::decode_identity_link;

use crate::github_api_client::GithubApiClient;
use crate::thread_store::{ThreadComment, ThreadRecord, ThreadStore};
use crate::tracker_error::TrackerError;

#[derive(Clone)]
pub struct ReconciliationScanner {
    client: GithubApiClient,
    store: ThreadStore,
}

impl ReconciliationScanner {
    pub fn new(client: GithubApiClient, store: ThreadStore) -> Self {
        Self { client, store }
    }

    /// Lists every issue and comment and rebuilds the thread records they link to.
    pub async fn load_all(&self) -> Result<Vec<ThreadRecord>, TrackerError> {
        let issues = self.client.list_repo_issues().await?;
        let comments = self.client.list_repo_comments().await?;
        let catalog = self.store.available_tags();
        let threads = build_threads(&issues, &comments, &catalog);
        tracing::info!(
            issues = issues.len(),
            comments = comments.len(),
            threads = threads.len(),
            "github reconciliation loaded threads"
        );
        Ok(threads)
    }

    /// Replaces the store contents with the tracker view; a listing failure
    /// leaves the store untouched.
    pub async fn reconcile_into_store(&self) -> Result<usize, TrackerError> {
        let threads = match self.load_all().await {
            Ok(threads) => threads,
            Err(error) => {
                tracing::error!(error = %error, "github reconciliation failed");
                return Err(error);
            }
        };
        let count = threads.len();
        self.store.replace_all(threads);
        Ok(count)
    }
}

/// Builds thread records from listed issues and comments.
pub fn build_threads(
    issues: &[GithubIssue],
    comments: &[GithubIssueComment],
    catalog: &[ForumTag],
) -> Vec<ThreadRecord> {
    let mut threads: Vec<ThreadRecord> = Vec::new();
    for issue in issues {
        let body = issue.body.as_deref().unwrap_or_default();
        let Some(link) = decode_identity_link(body) else {
            continue;
        };
        if let Some(existing) = threads.iter().find(|thread| thread.id == link.channel_id) {
            tracing::debug!(
                thread_id = link.channel_id.as_str(),
                kept_issue = existing.number,
                dropped_issue = issue.number,
                "github reconciliation found duplicate issue for thread"
            );
            continue;
        }
        threads.push(ThreadRecord {
            id: link.channel_id,
            title: issue.title.clone(),
            number: Some(issue.number),
            node_id: Some(issue.node_id.clone()),
            body: body.to_string(),
            locked: issue.locked,
            archived: issue.state == GithubIssueState::Closed,
            applied_tags: resolve_tag_ids(
                issue.labels.iter().map(|label| label.name.as_str()),
                catalog,
            ),
            comments: Vec::new(),
        });
    }

    for comment in comments {
        let Some(link) = comment.body.as_deref().and_then(decode_identity_link) else {
            continue;
        };
        let Some(thread) = threads
            .iter_mut()
            .find(|thread| thread.id == link.channel_id)
        else {
            tracing::debug!(
                comment_id = comment.id,
                thread_id = link.channel_id.as_str(),
                "github reconciliation dropped comment without a mirrored thread"
            );
            continue;
        };
        let appended = thread.push_comment(ThreadComment {
            id: link.message_id,
            git_id: comment.id,
        });
        if !appended {
            tracing::debug!(
                comment_id = comment.id,
                thread_id = thread.id.as_str(),
                "github reconciliation skipped duplicate comment link"
            );
        }
    }
    threads
}
