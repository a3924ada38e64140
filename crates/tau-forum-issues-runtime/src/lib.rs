//! GitHub side of the Tau forum sync: app-authenticated client, permission
//! gate, rate-limit backoff, thread store, sync engine and reconciliation.

pub mod app_credentials;
pub mod backoff;
pub mod github_api_client;
pub mod permission_gate;
pub mod reconcile;
pub mod startup;
pub mod sync_config;
pub mod sync_engine;
pub mod thread_store;
pub mod tracker_error;

#[cfg(test)]
mod test_support;

pub use app_credentials::{GithubAppCredentials, StaticTokenCredentials, TrackerCredentials};
pub use backoff::{BackoffError, BackoffPolicy, RetryClass, RetryClassify};
pub use github_api_client::GithubApiClient;
pub use permission_gate::{check_permissions, PermissionReport, INSUFFICIENT_PERMISSIONS_MESSAGE};
pub use reconcile::{build_threads, ReconciliationScanner};
pub use startup::{initialize, Readiness};
pub use sync_config::{AppAuthConfig, RepoRef, SyncConfig};
pub use sync_engine::{
    SkipReason, SyncAction, SyncEngine, SyncFailure, SyncOutcome, ThreadEvent, ThreadSeed,
};
pub use thread_store::{ThreadComment, ThreadRecord, ThreadStore};
pub use tracker_error::TrackerError;
