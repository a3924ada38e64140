use std::sync::Arc;

use tau_forum_issues::chat_message::{ChatAttachment, ChatAuthor, ChatMessage};

use crate::app_credentials::StaticTokenCredentials;
use crate::github_api_client::GithubApiClient;
use crate::sync_config::{AppAuthConfig, RepoRef, SyncConfig};

pub(crate) const TEST_GUILD_ID: &str = "100";

pub(crate) fn test_client(base_url: &str) -> GithubApiClient {
    GithubApiClient::new(
        base_url.to_string(),
        format!("{base_url}/graphql"),
        RepoRef::parse("owner/repo").expect("repo"),
        Arc::new(StaticTokenCredentials::new("test-token")),
        2_000,
    )
    .expect("client")
    .with_installation_id(77)
}

pub(crate) fn test_config(base_url: &str, additional_labels: &str) -> SyncConfig {
    let app = AppAuthConfig {
        app_id: 1,
        installation_id: 77,
        private_key_pem: String::new(),
        client_id: None,
        client_secret: None,
    };
    let mut config = SyncConfig::new(app, "owner/repo", additional_labels).expect("config");
    config.api_base = base_url.to_string();
    config.graphql_url = format!("{base_url}/graphql");
    config.retry_base_delay_ms = 1;
    config
}

pub(crate) fn chat_message(channel_id: &str, message_id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        guild_id: TEST_GUILD_ID.to_string(),
        channel_id: channel_id.to_string(),
        message_id: message_id.to_string(),
        author: ChatAuthor {
            id: "42".to_string(),
            display_name: "alice".to_string(),
            avatar_url: Some("https://cdn.example/alice.png".to_string()),
        },
        content: content.to_string(),
        attachments: Vec::new(),
    }
}

pub(crate) fn attachment(name: &str, content_type: &str) -> ChatAttachment {
    ChatAttachment {
        url: format!("https://cdn.example/{name}"),
        name: name.to_string(),
        content_type: Some(content_type.to_string()),
    }
}
