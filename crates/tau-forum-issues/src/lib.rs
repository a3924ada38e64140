//! Shared helpers for the Tau Discord forum to GitHub issues sync.
//! This crate provides the identity-link codec, message rendering, label
//! assembly, and GitHub wire types consumed by the sync runtime.

pub mod chat_message;
pub mod forum_labels;
pub mod forum_render;
pub mod github_transport_helpers;
pub mod github_types;
pub mod identity_link;
