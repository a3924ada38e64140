use serde::{Deserialize, Serialize};

use crate::identity_link::IdentityLink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Author of a Discord message as delivered by the chat client.
pub struct ChatAuthor {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `ChatAttachment` used across Tau forum sync components.
pub struct ChatAttachment {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One Discord message consumed by the sync engine.
pub struct ChatMessage {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub author: ChatAuthor,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<ChatAttachment>,
}

impl ChatMessage {
    pub fn identity_link(&self) -> IdentityLink {
        IdentityLink::new(&self.guild_id, &self.channel_id, &self.message_id)
    }
}
