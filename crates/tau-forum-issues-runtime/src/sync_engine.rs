//! Maps Discord thread lifecycle events onto GitHub issue operations.
//!
//! Each event either hits its precondition and issues exactly one tracker call,
//! or is skipped with a diagnostic and no call. Tracker failures end in a log
//! line and a [`SyncOutcome`]; nothing is returned to the event dispatcher as
//! an error.

use serde::Serialize;
use tau_forum_issues::chat_message::ChatMessage;
use tau_forum_issues::forum_labels::{assemble_issue_labels, resolve_tag_names};
use tau_forum_issues::forum_render::render_message_body;
use tau_forum_issues::github_transport_helpers::{comment_web_url, issue_web_url};
use tau_forum_issues::github_types::GithubIssueState;

use crate::backoff::{BackoffError, BackoffPolicy};
use crate::github_api_client::GithubApiClient;
use crate::permission_gate::{check_permissions, INSUFFICIENT_PERMISSIONS_MESSAGE};
use crate::sync_config::SyncConfig;
use crate::thread_store::{ThreadComment, ThreadRecord, ThreadStore};
use crate::tracker_error::TrackerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Thread metadata known when a Discord thread is first opened.
pub struct ThreadSeed {
    pub id: String,
    pub title: String,
    pub applied_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Discord-side events the engine reacts to.
pub enum ThreadEvent {
    ThreadOpened {
        thread: ThreadSeed,
        message: ChatMessage,
    },
    MessagePosted {
        thread_id: String,
        message: ChatMessage,
    },
    ThreadClosed {
        thread_id: String,
    },
    ThreadReopened {
        thread_id: String,
    },
    ThreadLocked {
        thread_id: String,
    },
    ThreadUnlocked {
        thread_id: String,
    },
    MessageDeleted {
        thread_id: String,
        message_id: String,
    },
    ThreadDeleted {
        thread_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `SyncAction` values.
pub enum SyncAction {
    CreateIssue,
    CreateComment,
    CloseIssue,
    OpenIssue,
    LockIssue,
    UnlockIssue,
    DeleteComment,
    DeleteIssue,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIssue => "create_issue",
            Self::CreateComment => "create_comment",
            Self::CloseIssue => "close_issue",
            Self::OpenIssue => "open_issue",
            Self::LockIssue => "lock_issue",
            Self::UnlockIssue => "unlock_issue",
            Self::DeleteComment => "delete_comment",
            Self::DeleteIssue => "delete_issue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
/// Why an event was skipped without a tracker call.
pub enum SkipReason {
    ThreadNotFound,
    AlreadySynced { issue_number: u64 },
    NotSynced,
    MissingNodeId,
    CommentNotFound { message_id: String },
    CommentAlreadyMirrored { message_id: String },
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            Self::ThreadNotFound => "thread is not tracked".to_string(),
            Self::AlreadySynced { issue_number } => {
                format!("thread already mirrored as issue #{issue_number}")
            }
            Self::NotSynced => "thread has no github issue number".to_string(),
            Self::MissingNodeId => "thread has no github node id".to_string(),
            Self::CommentNotFound { message_id } => {
                format!("message {message_id} has no mirrored comment")
            }
            Self::CommentAlreadyMirrored { message_id } => {
                format!("message {message_id} is already mirrored")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Tracker failure classified for logging.
pub enum SyncFailure {
    Reported { message: String },
    Unknown { detail: String },
}

impl SyncFailure {
    fn from_tracker_error(error: &TrackerError) -> Self {
        match error.message() {
            Some(message) => Self::Reported {
                message: message.to_string(),
            },
            None => Self::Unknown {
                detail: error.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
/// Result of handling one event.
pub enum SyncOutcome {
    Applied {
        action: SyncAction,
        url: String,
    },
    Skipped {
        action: SyncAction,
        reason: SkipReason,
    },
    Denied {
        action: SyncAction,
        reason: String,
    },
    Failed {
        action: SyncAction,
        failure: SyncFailure,
    },
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    client: GithubApiClient,
    store: ThreadStore,
    additional_labels: Vec<String>,
    web_base: String,
    delete_backoff: BackoffPolicy,
}

impl SyncEngine {
    pub fn new(client: GithubApiClient, store: ThreadStore, config: &SyncConfig) -> Self {
        Self {
            client,
            store,
            additional_labels: config.additional_labels.clone(),
            web_base: config.web_base.clone(),
            delete_backoff: config.backoff_policy(),
        }
    }

    pub fn store(&self) -> &ThreadStore {
        &self.store
    }

    /// Dispatches one Discord event.
    pub async fn handle(&self, event: ThreadEvent) -> SyncOutcome {
        match event {
            ThreadEvent::ThreadOpened { thread, message } => {
                self.create_issue(thread, &message).await
            }
            ThreadEvent::MessagePosted { thread_id, message } => {
                self.create_comment(&thread_id, &message).await
            }
            ThreadEvent::ThreadClosed { thread_id } => {
                self.set_issue_state(&thread_id, GithubIssueState::Closed)
                    .await
            }
            ThreadEvent::ThreadReopened { thread_id } => {
                self.set_issue_state(&thread_id, GithubIssueState::Open)
                    .await
            }
            ThreadEvent::ThreadLocked { thread_id } => self.set_issue_lock(&thread_id, true).await,
            ThreadEvent::ThreadUnlocked { thread_id } => {
                self.set_issue_lock(&thread_id, false).await
            }
            ThreadEvent::MessageDeleted {
                thread_id,
                message_id,
            } => self.delete_comment(&thread_id, &message_id).await,
            ThreadEvent::ThreadDeleted { thread_id } => self.delete_issue(&thread_id).await,
        }
    }

    /// Mirrors the first message of a new thread as a GitHub issue.
    pub async fn create_issue(&self, seed: ThreadSeed, message: &ChatMessage) -> SyncOutcome {
        let action = SyncAction::CreateIssue;
        let thread_id = seed.id.clone();
        self.store.insert(ThreadRecord::new(
            seed.id.as_str(),
            seed.title.as_str(),
            seed.applied_tags.clone(),
        ));
        let Some(thread) = self.store.get(&thread_id) else {
            return skipped(action, &thread_id, SkipReason::ThreadNotFound);
        };
        if let Some(issue_number) = thread.number {
            return skipped(action, &thread_id, SkipReason::AlreadySynced { issue_number });
        }

        let tag_names = resolve_tag_names(&thread.applied_tags, &self.store.available_tags());
        let labels = assemble_issue_labels(&tag_names, &self.additional_labels);
        let body = render_message_body(message);
        match self.client.create_issue(&thread.title, &body, &labels).await {
            Ok(created) => {
                let url = self.issue_url(created.number);
                self.store.update(&thread_id, |record| {
                    record.number = Some(created.number);
                    record.node_id = Some(created.node_id.clone());
                    record.body = created.body.clone().unwrap_or(body);
                });
                applied(action, &thread_id, url)
            }
            Err(error) => failed(action, &thread_id, &error),
        }
    }

    /// Mirrors a follow-up message as a comment on the thread's issue.
    pub async fn create_comment(&self, thread_id: &str, message: &ChatMessage) -> SyncOutcome {
        let action = SyncAction::CreateComment;
        let issue_number = match self.synced_issue_number(action, thread_id) {
            Ok(issue_number) => issue_number,
            Err(outcome) => return outcome,
        };
        let already_mirrored = self
            .store
            .get(thread_id)
            .is_some_and(|thread| thread.find_comment(&message.message_id).is_some());
        if already_mirrored {
            return skipped(
                action,
                thread_id,
                SkipReason::CommentAlreadyMirrored {
                    message_id: message.message_id.clone(),
                },
            );
        }

        let body = render_message_body(message);
        match self.client.create_issue_comment(issue_number, &body).await {
            Ok(created) => {
                self.store.update(thread_id, |record| {
                    record.push_comment(ThreadComment {
                        id: message.message_id.clone(),
                        git_id: created.id,
                    })
                });
                let url = self.comment_url(issue_number, created.id);
                applied(action, thread_id, url)
            }
            Err(error) => failed(action, thread_id, &error),
        }
    }

    pub async fn set_issue_state(&self, thread_id: &str, state: GithubIssueState) -> SyncOutcome {
        let action = match state {
            GithubIssueState::Closed => SyncAction::CloseIssue,
            GithubIssueState::Open => SyncAction::OpenIssue,
        };
        let issue_number = match self.synced_issue_number(action, thread_id) {
            Ok(issue_number) => issue_number,
            Err(outcome) => return outcome,
        };
        match self.client.update_issue_state(issue_number, state).await {
            Ok(()) => {
                self.store.update(thread_id, |record| {
                    record.archived = state == GithubIssueState::Closed;
                });
                applied(action, thread_id, self.issue_url(issue_number))
            }
            Err(error) => failed(action, thread_id, &error),
        }
    }

    pub async fn set_issue_lock(&self, thread_id: &str, locked: bool) -> SyncOutcome {
        let action = if locked {
            SyncAction::LockIssue
        } else {
            SyncAction::UnlockIssue
        };
        let issue_number = match self.synced_issue_number(action, thread_id) {
            Ok(issue_number) => issue_number,
            Err(outcome) => return outcome,
        };
        let result = if locked {
            self.client.lock_issue(issue_number).await
        } else {
            self.client.unlock_issue(issue_number).await
        };
        match result {
            Ok(()) => {
                self.store.update(thread_id, |record| record.locked = locked);
                applied(action, thread_id, self.issue_url(issue_number))
            }
            Err(error) => failed(action, thread_id, &error),
        }
    }

    /// Deletes the GitHub comment mirroring a deleted Discord message.
    pub async fn delete_comment(&self, thread_id: &str, message_id: &str) -> SyncOutcome {
        let action = SyncAction::DeleteComment;
        let (thread, issue_number) = match self.synced_thread(action, thread_id) {
            Ok(synced) => synced,
            Err(outcome) => return outcome,
        };
        let Some(comment) = thread.find_comment(message_id).cloned() else {
            return skipped(
                action,
                thread_id,
                SkipReason::CommentNotFound {
                    message_id: message_id.to_string(),
                },
            );
        };
        match self.client.delete_issue_comment(comment.git_id).await {
            Ok(()) => {
                self.store
                    .update(thread_id, |record| record.remove_comment(message_id));
                applied(
                    action,
                    thread_id,
                    self.comment_url(issue_number, comment.git_id),
                )
            }
            Err(error) => failed(action, thread_id, &error),
        }
    }

    /// Deletes the thread's issue after the permission gate passes. The local
    /// record is left for the owning collaborator to discard.
    pub async fn delete_issue(&self, thread_id: &str) -> SyncOutcome {
        let action = SyncAction::DeleteIssue;
        let (thread, issue_number) = match self.synced_thread(action, thread_id) {
            Ok(synced) => synced,
            Err(outcome) => return outcome,
        };
        let Some(node_id) = thread.node_id.clone() else {
            return skipped(action, thread_id, SkipReason::MissingNodeId);
        };

        match check_permissions(&self.client).await {
            Ok(report) if report.granted => {}
            Ok(report) => {
                let reason = format!(
                    "{INSUFFICIENT_PERMISSIONS_MESSAGE} (issues: {}, administration: {})",
                    report.issues.as_deref().unwrap_or("none"),
                    report.administration.as_deref().unwrap_or("none")
                );
                return denied(action, thread_id, reason);
            }
            Err(error) => {
                let reason =
                    format!("{INSUFFICIENT_PERMISSIONS_MESSAGE}: permission check failed: {error}");
                return denied(action, thread_id, reason);
            }
        }

        let client = &self.client;
        let result = self
            .delete_backoff
            .run(action.as_str(), || client.delete_issue(&node_id))
            .await;
        match result {
            Ok(()) => applied(action, thread_id, self.issue_url(issue_number)),
            Err(BackoffError::Unauthorized { source, attempts }) => denied(
                action,
                thread_id,
                format!("authorization failure after {attempts} attempt(s): {source}"),
            ),
            Err(error) => failed(action, thread_id, &error.into_last_error()),
        }
    }

    fn synced_issue_number(&self, action: SyncAction, thread_id: &str) -> Result<u64, SyncOutcome> {
        self.synced_thread(action, thread_id)
            .map(|(_, issue_number)| issue_number)
    }

    /// Snapshot of a thread that already has an issue number; anything else is
    /// skipped before a tracker call.
    fn synced_thread(
        &self,
        action: SyncAction,
        thread_id: &str,
    ) -> Result<(ThreadRecord, u64), SyncOutcome> {
        let Some(thread) = self.store.get(thread_id) else {
            return Err(skipped(action, thread_id, SkipReason::ThreadNotFound));
        };
        match thread.number {
            Some(issue_number) => Ok((thread, issue_number)),
            None => Err(skipped(action, thread_id, SkipReason::NotSynced)),
        }
    }

    fn issue_url(&self, issue_number: u64) -> String {
        let repo = self.client.repo();
        issue_web_url(&self.web_base, &repo.owner, &repo.name, issue_number)
    }

    fn comment_url(&self, issue_number: u64, comment_id: u64) -> String {
        let repo = self.client.repo();
        comment_web_url(&self.web_base, &repo.owner, &repo.name, issue_number, comment_id)
    }
}

fn applied(action: SyncAction, thread_id: &str, url: String) -> SyncOutcome {
    tracing::info!(
        action = action.as_str(),
        thread_id,
        url = url.as_str(),
        "github sync applied"
    );
    SyncOutcome::Applied { action, url }
}

fn skipped(action: SyncAction, thread_id: &str, reason: SkipReason) -> SyncOutcome {
    tracing::error!(
        action = action.as_str(),
        thread_id,
        reason = reason.describe().as_str(),
        "github sync skipped"
    );
    SyncOutcome::Skipped { action, reason }
}

fn denied(action: SyncAction, thread_id: &str, reason: String) -> SyncOutcome {
    tracing::error!(
        action = action.as_str(),
        thread_id,
        reason = reason.as_str(),
        "github sync denied"
    );
    SyncOutcome::Denied { action, reason }
}

fn failed(action: SyncAction, thread_id: &str, error: &TrackerError) -> SyncOutcome {
    let failure = SyncFailure::from_tracker_error(error);
    match &failure {
        SyncFailure::Reported { message } => tracing::error!(
            action = action.as_str(),
            thread_id,
            message = message.as_str(),
            "github sync failed"
        ),
        SyncFailure::Unknown { detail } => tracing::error!(
            action = action.as_str(),
            thread_id,
            detail = detail.as_str(),
            "github sync failed with unknown error"
        ),
    }
    SyncOutcome::Failed { action, failure }
}
