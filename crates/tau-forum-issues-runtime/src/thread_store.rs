//! In-memory thread records shared by the sync engine and reconciliation scanner.
//!
//! The store is the only owner of the mapping. Callers take snapshots and apply
//! updates through closures; no guard ever outlives a single call, so nothing
//! is held across a network await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tau_forum_issues::forum_labels::ForumTag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Link between a Discord message and the GitHub comment mirroring it.
pub struct ThreadComment {
    pub id: String,
    pub git_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// One Discord thread mirrored to one GitHub issue.
pub struct ThreadRecord {
    pub id: String,
    pub title: String,
    pub number: Option<u64>,
    pub node_id: Option<String>,
    pub body: String,
    pub locked: bool,
    pub archived: bool,
    pub applied_tags: Vec<String>,
    pub comments: Vec<ThreadComment>,
}

impl ThreadRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, applied_tags: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            applied_tags,
            ..Self::default()
        }
    }

    pub fn find_comment(&self, message_id: &str) -> Option<&ThreadComment> {
        self.comments.iter().find(|comment| comment.id == message_id)
    }

    /// Appends a comment link unless either id is already present.
    pub fn push_comment(&mut self, comment: ThreadComment) -> bool {
        let duplicate = self
            .comments
            .iter()
            .any(|existing| existing.id == comment.id || existing.git_id == comment.git_id);
        if duplicate {
            return false;
        }
        self.comments.push(comment);
        true
    }

    pub fn remove_comment(&mut self, message_id: &str) -> Option<ThreadComment> {
        let index = self
            .comments
            .iter()
            .position(|comment| comment.id == message_id)?;
        Some(self.comments.remove(index))
    }
}

#[derive(Debug, Default)]
struct ThreadStoreState {
    threads: Vec<ThreadRecord>,
    available_tags: Vec<ForumTag>,
}

#[derive(Debug, Clone, Default)]
/// Public struct `ThreadStore` used across Tau forum sync components.
pub struct ThreadStore {
    state: Arc<Mutex<ThreadStoreState>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ThreadStoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().threads.is_empty()
    }

    pub fn get(&self, thread_id: &str) -> Option<ThreadRecord> {
        self.lock()
            .threads
            .iter()
            .find(|thread| thread.id == thread_id)
            .cloned()
    }

    pub fn list(&self) -> Vec<ThreadRecord> {
        self.lock().threads.clone()
    }

    /// Inserts a record; an existing record with the same id is kept.
    pub fn insert(&self, record: ThreadRecord) -> bool {
        let mut state = self.lock();
        if state.threads.iter().any(|thread| thread.id == record.id) {
            return false;
        }
        state.threads.push(record);
        true
    }

    pub fn update<R>(&self, thread_id: &str, apply: impl FnOnce(&mut ThreadRecord) -> R) -> Option<R> {
        let mut state = self.lock();
        let thread = state
            .threads
            .iter_mut()
            .find(|thread| thread.id == thread_id)?;
        Some(apply(thread))
    }

    pub fn remove(&self, thread_id: &str) -> Option<ThreadRecord> {
        let mut state = self.lock();
        let index = state
            .threads
            .iter()
            .position(|thread| thread.id == thread_id)?;
        Some(state.threads.remove(index))
    }

    pub fn replace_all(&self, threads: Vec<ThreadRecord>) {
        self.lock().threads = threads;
    }

    pub fn set_available_tags(&self, tags: Vec<ForumTag>) {
        self.lock().available_tags = tags;
    }

    pub fn available_tags(&self) -> Vec<ForumTag> {
        self.lock().available_tags.clone()
    }
}
