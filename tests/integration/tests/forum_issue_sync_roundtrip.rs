use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;
use tau_forum_issues::chat_message::{ChatAttachment, ChatAuthor, ChatMessage};
use tau_forum_issues::forum_labels::ForumTag;
use tau_forum_issues::forum_render::render_message_body;
use tau_forum_issues::identity_link::collect_identity_links;
use tau_forum_issues_runtime::{
    AppAuthConfig, GithubApiClient, ReconciliationScanner, RepoRef, SkipReason,
    StaticTokenCredentials, SyncAction, SyncConfig, SyncEngine, SyncFailure, SyncOutcome,
    ThreadEvent, ThreadRecord, ThreadSeed, ThreadStore, INSUFFICIENT_PERMISSIONS_MESSAGE,
};

const TEST_PRIVATE_KEY_PEM: &str =
    include_str!("../../../crates/tau-forum-issues-runtime/testdata/github-app-test-key.pem");

fn sync_config(server: &MockServer, private_key_pem: &str, additional_labels: &str) -> SyncConfig {
    let app = AppAuthConfig {
        app_id: 4242,
        installation_id: 77,
        private_key_pem: private_key_pem.to_string(),
        client_id: Some("Iv1.integration".to_string()),
        client_secret: Some("integration-secret".to_string()),
    };
    let mut config = SyncConfig::new(app, "owner/repo", additional_labels).expect("config");
    config.api_base = server.base_url();
    config.graphql_url = format!("{}/graphql", server.base_url());
    config.request_timeout_ms = 2_000;
    config.retry_base_delay_ms = 1;
    config
}

fn static_client(server: &MockServer) -> GithubApiClient {
    GithubApiClient::new(
        server.base_url(),
        format!("{}/graphql", server.base_url()),
        RepoRef::parse("owner/repo").expect("repo"),
        Arc::new(StaticTokenCredentials::new("static-token")),
        2_000,
    )
    .expect("client")
    .with_installation_id(77)
}

fn chat_message(channel_id: &str, message_id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        guild_id: "100".to_string(),
        channel_id: channel_id.to_string(),
        message_id: message_id.to_string(),
        author: ChatAuthor {
            id: "42".to_string(),
            display_name: "alice".to_string(),
            avatar_url: None,
        },
        content: content.to_string(),
        attachments: Vec::new(),
    }
}

fn synced_thread(thread_id: &str, number: u64) -> ThreadRecord {
    let mut record = ThreadRecord::new(thread_id, "Crash on start", Vec::new());
    record.number = Some(number);
    record.node_id = Some(format!("I_node{number}"));
    record
}

#[tokio::test]
async fn integration_new_thread_with_png_and_pdf_creates_issue_through_app_token_flow() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/app/installations/77/access_tokens")
            .header_exists("authorization");
        then.status(201).json_body(json!({
            "token": "ghs_installation",
            "expires_at": "2099-01-01T00:00:00Z"
        }));
    });

    let mut message = chat_message("200", "300", "The app crashes on start");
    message.attachments = vec![
        ChatAttachment {
            url: "https://cdn.example/shot.png".to_string(),
            name: "shot.png".to_string(),
            content_type: Some("image/png".to_string()),
        },
        ChatAttachment {
            url: "https://cdn.example/trace.pdf".to_string(),
            name: "trace.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
        },
    ];
    let rendered = render_message_body(&message);
    let links = collect_identity_links(&rendered);
    assert!(!links.is_empty());
    assert!(links.iter().all(|link| link == &links[0]));
    assert_eq!(rendered.matches("![shot.png](https://cdn.example/shot.png)").count(), 1);
    assert!(!rendered.contains("trace.pdf"));

    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/owner/repo/issues")
            .header("authorization", "Bearer ghs_installation")
            .json_body(json!({
                "title": "Crash on start",
                "body": rendered,
                "labels": ["bug", "triage", "urgent"]
            }));
        then.status(201).json_body(json!({
            "id": 9001,
            "number": 12,
            "node_id": "I_kwDOA12",
            "body": rendered,
            "html_url": "https://github.com/owner/repo/issues/12"
        }));
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/owner/repo/issues/12/comments")
            .header("authorization", "Bearer ghs_installation");
        then.status(201).json_body(json!({"id": 555}));
    });

    let config = sync_config(&server, TEST_PRIVATE_KEY_PEM, "triage, urgent");
    let store = ThreadStore::new();
    store.set_available_tags(vec![ForumTag {
        id: "t-bug".to_string(),
        name: "bug".to_string(),
    }]);
    let engine = SyncEngine::new(config.build_client().expect("client"), store.clone(), &config);

    let outcome = engine
        .handle(ThreadEvent::ThreadOpened {
            thread: ThreadSeed {
                id: "200".to_string(),
                title: "Crash on start".to_string(),
                applied_tags: vec!["t-bug".to_string()],
            },
            message,
        })
        .await;
    assert_eq!(
        outcome,
        SyncOutcome::Applied {
            action: SyncAction::CreateIssue,
            url: "https://github.com/owner/repo/issues/12".to_string(),
        }
    );
    let outcome = engine
        .handle(ThreadEvent::MessagePosted {
            thread_id: "200".to_string(),
            message: chat_message("200", "301", "Still crashing"),
        })
        .await;
    assert!(outcome.is_applied());

    create.assert_calls(1);
    comment.assert_calls(1);
    token.assert_calls(1);
    let thread = store.get("200").expect("thread");
    assert_eq!(thread.number, Some(12));
    assert_eq!(thread.node_id.as_deref(), Some("I_kwDOA12"));
    assert_eq!(thread.comments.len(), 1);
}

#[tokio::test]
async fn integration_reconciliation_recovers_linked_issue_and_comment_only() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues");
        then.status(200).json_body(json!([
            {
                "id": 1, "node_id": "I_1", "number": 1, "title": "Mirrored",
                "body": render_message_body(&chat_message("200", "300", "hello")),
                "state": "open", "locked": false, "labels": []
            },
            {
                "id": 2, "node_id": "I_2", "number": 2, "title": "Filed on GitHub",
                "body": "no discord origin", "state": "closed", "labels": []
            }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/comments");
        then.status(200).json_body(json!([
            {"id": 10, "body": render_message_body(&chat_message("200", "301", "reply"))}
        ]));
    });
    let store = ThreadStore::new();
    let scanner = ReconciliationScanner::new(static_client(&server), store.clone());

    let threads = scanner.load_all().await.expect("load");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].id, "200");
    assert_eq!(threads[0].number, Some(1));
    assert_eq!(threads[0].comments.len(), 1);
    assert_eq!(threads[0].comments[0].id, "301");
    assert_eq!(threads[0].comments[0].git_id, 10);

    assert_eq!(scanner.reconcile_into_store().await.expect("reconcile"), 1);
    assert_eq!(store.list(), threads);
}

#[tokio::test]
async fn integration_delete_without_issue_write_is_denied_with_zero_graphql_calls() {
    let server = MockServer::start();
    let installation = server.mock(|when, then| {
        when.method(GET).path("/app/installations/77");
        then.status(200).json_body(json!({
            "id": 77,
            "permissions": {"issues": "read", "metadata": "read"}
        }));
    });
    let graphql = server.mock(|when, then| {
        when.method(POST).path("/graphql");
        then.status(200).json_body(json!({"data": {}}));
    });
    let config = sync_config(&server, "", "");
    let store = ThreadStore::new();
    store.insert(synced_thread("200", 12));
    let engine = SyncEngine::new(static_client(&server), store, &config);

    let outcome = engine
        .handle(ThreadEvent::ThreadDeleted {
            thread_id: "200".to_string(),
        })
        .await;

    match outcome {
        SyncOutcome::Denied { action, reason } => {
            assert_eq!(action, SyncAction::DeleteIssue);
            assert!(reason.contains(INSUFFICIENT_PERMISSIONS_MESSAGE));
            assert!(reason.contains("lacks required permissions"));
        }
        other => panic!("expected denial, got {other:?}"),
    }
    installation.assert_calls(1);
    graphql.assert_calls(0);
}

#[tokio::test]
async fn integration_unsynced_thread_events_make_zero_tracker_calls() {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH);
        then.status(200).json_body(json!({}));
    });
    let post = server.mock(|when, then| {
        when.method(POST);
        then.status(201).json_body(json!({"id": 1}));
    });
    let config = sync_config(&server, "", "");
    let store = ThreadStore::new();
    store.insert(ThreadRecord::new("200", "Never mirrored", Vec::new()));
    let engine = SyncEngine::new(static_client(&server), store, &config);

    let closed = engine
        .handle(ThreadEvent::ThreadClosed {
            thread_id: "200".to_string(),
        })
        .await;
    let posted = engine
        .handle(ThreadEvent::MessagePosted {
            thread_id: "200".to_string(),
            message: chat_message("200", "301", "hello?"),
        })
        .await;

    assert_eq!(
        closed,
        SyncOutcome::Skipped {
            action: SyncAction::CloseIssue,
            reason: SkipReason::NotSynced,
        }
    );
    assert_eq!(
        posted,
        SyncOutcome::Skipped {
            action: SyncAction::CreateComment,
            reason: SkipReason::NotSynced,
        }
    );
    patch.assert_calls(0);
    post.assert_calls(0);
}

#[tokio::test]
async fn integration_rate_limited_delete_is_attempted_exactly_three_times() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/app/installations/77");
        then.status(200)
            .json_body(json!({"id": 77, "permissions": {"issues": "write"}}));
    });
    let graphql = server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .header("authorization", "Bearer static-token");
        then.status(403)
            .json_body(json!({"message": "You have exceeded a secondary rate limit"}));
    });
    let config = sync_config(&server, "", "");
    let store = ThreadStore::new();
    store.insert(synced_thread("200", 12));
    let engine = SyncEngine::new(static_client(&server), store.clone(), &config);

    let outcome = engine
        .handle(ThreadEvent::ThreadDeleted {
            thread_id: "200".to_string(),
        })
        .await;

    assert_eq!(
        outcome,
        SyncOutcome::Failed {
            action: SyncAction::DeleteIssue,
            failure: SyncFailure::Reported {
                message: "You have exceeded a secondary rate limit".to_string(),
            },
        }
    );
    graphql.assert_calls(3);
    assert!(store.get("200").is_some());
}
