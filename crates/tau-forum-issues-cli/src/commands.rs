use std::path::Path;

use anyhow::{bail, Context, Result};
use tau_forum_issues_runtime::reconcile::ReconciliationScanner;
use tau_forum_issues_runtime::startup::{initialize, Readiness};
use tau_forum_issues_runtime::sync_config::{AppAuthConfig, SyncConfig};
use tau_forum_issues_runtime::thread_store::{ThreadRecord, ThreadStore};

use crate::cli_args::{Cli, CliCommand, GithubArgs};

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_sync_config(&cli.github)?;
    let client = config.build_client()?;
    match cli.command {
        CliCommand::Check { json } => {
            let readiness = initialize(&client).await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&readiness)
                        .context("failed to render readiness report")?
                );
            } else {
                println!("{}", render_readiness(&config, &readiness));
            }
            if !readiness.is_ready() {
                bail!("github app for {} is not ready", config.repo.as_slug());
            }
        }
        CliCommand::Scan { json } => {
            let scanner = ReconciliationScanner::new(client, ThreadStore::new());
            let threads = scanner
                .load_all()
                .await
                .with_context(|| format!("failed to scan {}", config.repo.as_slug()))?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&threads)
                        .context("failed to render recovered threads")?
                );
            } else {
                for thread in &threads {
                    println!("{}", render_thread_line(thread));
                }
                println!("threads={}", threads.len());
            }
        }
    }
    Ok(())
}

/// Resolves command-line flags into the runtime configuration.
pub(crate) fn resolve_sync_config(args: &GithubArgs) -> Result<SyncConfig> {
    let private_key_pem = resolve_private_key(
        args.github_private_key.as_deref(),
        args.github_private_key_path.as_deref(),
    )?;
    let app = AppAuthConfig {
        app_id: args.github_app_id,
        installation_id: args.github_installation_id,
        private_key_pem,
        client_id: non_empty(args.github_client_id.as_deref()),
        client_secret: non_empty(args.github_client_secret.as_deref()),
    };
    let mut config = SyncConfig::new(app, &args.github_repo, &args.github_additional_labels)?;
    config.api_base = args.github_api_base.clone();
    config.graphql_url = args.github_graphql_url.clone();
    config.web_base = args.github_web_base.clone();
    config.request_timeout_ms = args.request_timeout_ms;
    config.retry_max_attempts = args.retry_max_attempts;
    config.retry_base_delay_ms = args.retry_base_delay_ms;
    Ok(config)
}

fn resolve_private_key(inline: Option<&str>, path: Option<&Path>) -> Result<String> {
    if let Some(raw) = inline.map(str::trim).filter(|raw| !raw.is_empty()) {
        // Keys passed through env files often carry escaped newlines.
        return Ok(raw.replace("\\n", "\n"));
    }
    let Some(path) = path else {
        bail!("--github-private-key or --github-private-key-path is required");
    };
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read github private key {}", path.display()))?;
    if pem.trim().is_empty() {
        bail!("github private key {} is empty", path.display());
    }
    Ok(pem)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn render_readiness(config: &SyncConfig, readiness: &Readiness) -> String {
    let permissions = readiness
        .permissions
        .as_ref()
        .map(|report| {
            format!(
                "granted={} issues={} administration={}",
                report.granted,
                report.issues.as_deref().unwrap_or("none"),
                report.administration.as_deref().unwrap_or("none")
            )
        })
        .unwrap_or_else(|| "unknown".to_string());
    let rate_limit = readiness
        .rate_limit
        .map(|window| format!("{}/{}", window.remaining, window.limit))
        .unwrap_or_else(|| "unknown".to_string());
    let mut lines = vec![
        format!("repo={}", config.repo.as_slug()),
        format!(
            "authenticated={} app={}",
            readiness.authenticated,
            readiness.app_slug.as_deref().unwrap_or("unknown")
        ),
        format!("permissions: {permissions}"),
        format!("rate_limit={rate_limit}"),
    ];
    lines.extend(readiness.errors.iter().map(|error| format!("error: {error}")));
    lines.push(format!("ready={}", readiness.is_ready()));
    lines.join("\n")
}

fn render_thread_line(thread: &ThreadRecord) -> String {
    format!(
        "thread={} issue={} locked={} archived={} tags={} comments={} title={}",
        thread.id,
        thread
            .number
            .map(|number| format!("#{number}"))
            .unwrap_or_else(|| "none".to_string()),
        thread.locked,
        thread.archived,
        thread.applied_tags.len(),
        thread.comments.len(),
        thread.title
    )
}
