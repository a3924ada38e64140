use tau_forum_issues::github_transport_helpers::{is_not_authorized_message, is_rate_limit_message};
use thiserror::Error;

use crate::backoff::{RetryClass, RetryClassify};

#[derive(Debug, Error)]
/// Enumerates supported `TrackerError` values.
pub enum TrackerError {
    #[error("no github client available: {0}")]
    NoClient(String),
    #[error("github api {operation} failed with status {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },
    #[error("github graphql {operation} failed: {message}")]
    Graphql { operation: String, message: String },
    #[error("github api {operation} failed with status {status} and an unrecognized body: {body}")]
    Unrecognized {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("github api {operation} request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode github {operation}: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TrackerError {
    /// The tracker-reported failure message, when the failure carried one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::NoClient(message) => Some(message.as_str()),
            Self::Api { message, .. } | Self::Graphql { message, .. } => Some(message.as_str()),
            Self::Unrecognized { .. } | Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.message().is_some_and(is_rate_limit_message)
            || matches!(self, Self::Unrecognized { status: 429, .. })
    }

    pub fn is_not_authorized(&self) -> bool {
        self.message().is_some_and(is_not_authorized_message)
    }
}

impl RetryClassify for TrackerError {
    fn retry_class(&self) -> RetryClass {
        // A failed credential fetch aborts the operation before any mutation.
        if matches!(self, Self::NoClient(_)) {
            RetryClass::Fatal
        } else if self.is_not_authorized() {
            RetryClass::Abort
        } else if self.is_rate_limited() {
            RetryClass::Retryable
        } else {
            RetryClass::Fatal
        }
    }
}
