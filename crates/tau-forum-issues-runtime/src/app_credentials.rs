//! GitHub App authentication: RS256 app JWTs and cached installation tokens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tau_forum_issues::github_transport_helpers::truncate_for_error;
use tau_forum_issues::github_types::GithubInstallationToken;
use tokio::sync::Mutex as AsyncMutex;

use crate::sync_config::AppAuthConfig;
use crate::tracker_error::TrackerError;

const APP_JWT_BACKDATE_SECONDS: i64 = 60;
const APP_JWT_LIFETIME_SECONDS: i64 = 9 * 60;
const INSTALLATION_TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;
const INSTALLATION_TOKEN_FALLBACK_LIFETIME_SECONDS: i64 = 50 * 60;

#[async_trait]
/// Trait contract for `TrackerCredentials` behavior.
pub trait TrackerCredentials: Send + Sync {
    /// Bearer token for app-level endpoints (`/app`, `/app/installations/{id}`).
    fn app_bearer(&self) -> Result<String, TrackerError>;

    /// Installation-scoped bearer token for repository and GraphQL calls.
    async fn installation_token(
        &self,
        http: &reqwest::Client,
        api_base: &str,
    ) -> Result<String, TrackerError>;
}

/// Fixed token used for both scopes; handy for tests and PAT deployments.
pub struct StaticTokenCredentials {
    token: String,
}

impl StaticTokenCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }
}

#[async_trait]
impl TrackerCredentials for StaticTokenCredentials {
    fn app_bearer(&self) -> Result<String, TrackerError> {
        Ok(self.token.clone())
    }

    async fn installation_token(
        &self,
        _http: &reqwest::Client,
        _api_base: &str,
    ) -> Result<String, TrackerError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Serialize)]
struct AppJwtClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Clone)]
struct CachedInstallationToken {
    token: String,
    expires_unix: i64,
}

pub struct GithubAppCredentials {
    issuer: String,
    installation_id: u64,
    encoding_key: EncodingKey,
    cached_token: AsyncMutex<Option<CachedInstallationToken>>,
}

impl GithubAppCredentials {
    pub fn new(config: &AppAuthConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key_pem.trim().as_bytes())
            .context("failed to parse github app private key (expected RSA PEM)")?;
        // GitHub accepts either the client id or the numeric app id as issuer.
        let issuer = config
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| config.app_id.to_string());
        Ok(Self {
            issuer,
            installation_id: config.installation_id,
            encoding_key,
            cached_token: AsyncMutex::new(None),
        })
    }

    fn sign_app_jwt(&self, now_unix: i64) -> Result<String, TrackerError> {
        let claims = AppJwtClaims {
            iat: now_unix - APP_JWT_BACKDATE_SECONDS,
            exp: now_unix + APP_JWT_LIFETIME_SECONDS,
            iss: self.issuer.clone(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|error| TrackerError::NoClient(format!("failed to sign app jwt: {error}")))
    }

    async fn fetch_installation_token(
        &self,
        http: &reqwest::Client,
        api_base: &str,
        now_unix: i64,
    ) -> Result<CachedInstallationToken, TrackerError> {
        let jwt = self.sign_app_jwt(now_unix)?;
        let response = http
            .post(format!(
                "{}/app/installations/{}/access_tokens",
                api_base.trim_end_matches('/'),
                self.installation_id
            ))
            .bearer_auth(jwt)
            .send()
            .await
            .map_err(|error| {
                TrackerError::NoClient(format!("installation token request failed: {error}"))
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|error| {
            TrackerError::NoClient(format!(
                "installation token response could not be read (status {}): {error}",
                status.as_u16()
            ))
        })?;
        if !status.is_success() {
            return Err(TrackerError::NoClient(format!(
                "installation token request failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 320)
            )));
        }
        let issued: GithubInstallationToken = serde_json::from_str(&body).map_err(|error| {
            TrackerError::NoClient(format!("invalid installation token response: {error}"))
        })?;
        let expires_unix = issued
            .expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|expires| expires.timestamp())
            .unwrap_or(now_unix + INSTALLATION_TOKEN_FALLBACK_LIFETIME_SECONDS);
        Ok(CachedInstallationToken {
            token: issued.token,
            expires_unix,
        })
    }
}

#[async_trait]
impl TrackerCredentials for GithubAppCredentials {
    fn app_bearer(&self) -> Result<String, TrackerError> {
        self.sign_app_jwt(Utc::now().timestamp())
    }

    async fn installation_token(
        &self,
        http: &reqwest::Client,
        api_base: &str,
    ) -> Result<String, TrackerError> {
        let now_unix = Utc::now().timestamp();
        let mut cached = self.cached_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_unix - INSTALLATION_TOKEN_REFRESH_MARGIN_SECONDS > now_unix {
                return Ok(token.token.clone());
            }
        }
        let fresh = self
            .fetch_installation_token(http, api_base, now_unix)
            .await?;
        tracing::debug!(
            installation_id = self.installation_id,
            expires_unix = fresh.expires_unix,
            "github installation token refreshed"
        );
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use serde::Deserialize;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::{GithubAppCredentials, StaticTokenCredentials, TrackerCredentials};
    use crate::sync_config::AppAuthConfig;
    use crate::tracker_error::TrackerError;

    const TEST_PRIVATE_KEY_PEM: &str = include_str!("../testdata/github-app-test-key.pem");
    const TEST_PUBLIC_KEY_PEM: &str = include_str!("../testdata/github-app-test-key.pub.pem");

    #[derive(Debug, Deserialize)]
    struct DecodedClaims {
        iat: i64,
        exp: i64,
        iss: String,
    }

    fn app_config(client_id: Option<&str>) -> AppAuthConfig {
        AppAuthConfig {
            app_id: 4242,
            installation_id: 77,
            private_key_pem: TEST_PRIVATE_KEY_PEM.to_string(),
            client_id: client_id.map(ToOwned::to_owned),
            client_secret: None,
        }
    }

    fn decode_claims(token: &str) -> DecodedClaims {
        let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY_PEM.as_bytes()).expect("public key");
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        decode::<DecodedClaims>(token, &key, &validation)
            .expect("decode jwt")
            .claims
    }

    #[test]
    fn unit_app_bearer_signs_rs256_jwt_with_app_id_issuer() {
        let credentials = GithubAppCredentials::new(&app_config(None)).expect("credentials");
        let claims = decode_claims(&credentials.app_bearer().expect("jwt"));
        assert_eq!(claims.iss, "4242");
        assert_eq!(claims.exp - claims.iat, 10 * 60);
    }

    #[test]
    fn functional_app_bearer_prefers_client_id_issuer() {
        let credentials =
            GithubAppCredentials::new(&app_config(Some("Iv1.forum"))).expect("credentials");
        let claims = decode_claims(&credentials.app_bearer().expect("jwt"));
        assert_eq!(claims.iss, "Iv1.forum");
    }

    #[tokio::test]
    async fn integration_installation_token_is_fetched_once_and_cached() {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/app/installations/77/access_tokens")
                .header_exists("authorization");
            then.status(201).json_body(json!({
                "token": "ghs_installation",
                "expires_at": "2999-01-01T00:00:00Z"
            }));
        });
        let credentials = GithubAppCredentials::new(&app_config(None)).expect("credentials");
        let http = reqwest::Client::new();
        let first = credentials
            .installation_token(&http, &server.base_url())
            .await
            .expect("token");
        let second = credentials
            .installation_token(&http, &server.base_url())
            .await
            .expect("cached token");
        assert_eq!(first, "ghs_installation");
        assert_eq!(second, "ghs_installation");
        token_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn regression_installation_token_failure_surfaces_as_no_client() {
        let server = MockServer::start();
        let _token_mock = server.mock(|when, then| {
            when.method(POST).path("/app/installations/77/access_tokens");
            then.status(401)
                .json_body(json!({"message": "A JSON web token could not be decoded"}));
        });
        let credentials = GithubAppCredentials::new(&app_config(None)).expect("credentials");
        let error = credentials
            .installation_token(&reqwest::Client::new(), &server.base_url())
            .await
            .expect_err("token failure");
        assert!(matches!(error, TrackerError::NoClient(_)));
        assert!(error.to_string().contains("status 401"));
    }

    #[tokio::test]
    async fn regression_truncated_token_response_surfaces_as_no_client() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut chunk).await.expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..read]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 201 Created\r\ncontent-type: application/json\r\ncontent-length: 200\r\n\r\n{\"token\":",
                )
                .await
                .expect("write partial response");
        });

        let credentials = GithubAppCredentials::new(&app_config(None)).expect("credentials");
        let error = credentials
            .installation_token(&reqwest::Client::new(), &format!("http://{address}"))
            .await
            .expect_err("truncated body");
        server.await.expect("server task");

        assert!(matches!(error, TrackerError::NoClient(_)));
        assert!(error.to_string().contains("could not be read (status 201)"));
    }

    #[tokio::test]
    async fn unit_static_token_credentials_serve_both_scopes() {
        let credentials = StaticTokenCredentials::new(" test-token ");
        assert_eq!(credentials.app_bearer().expect("app"), "test-token");
        let token = credentials
            .installation_token(&reqwest::Client::new(), "http://unused.local")
            .await
            .expect("installation");
        assert_eq!(token, "test-token");
    }
}
