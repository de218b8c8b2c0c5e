//! OAuth access tokens for the Drive and Sheets clients.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("token request failed: {0}")]
    Request(String),
    #[error("token endpoint returned HTTP {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("could not parse token response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, CredentialError>;
}

#[derive(Clone, Debug)]
pub struct OAuthClientSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    pub token_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3_600
}

struct CachedToken {
    token: SecretString,
    fetched_at: Instant,
    lifetime: Duration,
}

impl CachedToken {
    fn is_fresh(&self, refresh_margin: Duration) -> bool {
        self.fetched_at.elapsed().saturating_add(refresh_margin) < self.lifetime
    }
}

/// Exchanges a long-lived refresh token for access tokens and caches them.
///
/// The cache lock is held across the refresh, so concurrent callers that
/// find the token stale wait for one exchange instead of each starting
/// their own.
pub struct RefreshTokenCredentials {
    http: reqwest::Client,
    settings: OAuthClientSettings,
    cache: Mutex<Option<CachedToken>>,
    refresh_margin: Duration,
}

impl RefreshTokenCredentials {
    pub fn new(http: reqwest::Client, settings: OAuthClientSettings) -> Self {
        Self { http, settings, cache: Mutex::new(None), refresh_margin: Duration::from_secs(60) }
    }

    async fn fetch(&self) -> Result<(SecretString, Duration), CredentialError> {
        debug!(
            event_name = "google.credentials.refreshing",
            token_url = %self.settings.token_url,
            "requesting google access token"
        );

        let response = self
            .http
            .post(&self.settings.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.expose_secret()),
                ("refresh_token", self.settings.refresh_token.expose_secret()),
            ])
            .send()
            .await
            .map_err(|error| CredentialError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected { status: status.as_u16(), detail });
        }

        let token: TokenResponse =
            response.json().await.map_err(|error| CredentialError::Decode(error.to_string()))?;
        if token.access_token.is_empty() {
            return Err(CredentialError::Decode("empty access_token".to_owned()));
        }

        info!(
            event_name = "google.credentials.refreshed",
            expires_in_secs = token.expires_in,
            "google access token refreshed"
        );
        Ok((token.access_token.into(), Duration::from_secs(token.expires_in)))
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenCredentials {
    async fn access_token(&self) -> Result<SecretString, CredentialError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(self.refresh_margin) {
                return Ok(cached.token.clone());
            }
        }

        let (token, lifetime) = self.fetch().await?;
        *cache = Some(CachedToken { token: token.clone(), fetched_at: Instant::now(), lifetime });
        Ok(token)
    }
}

/// Fixed token, for local runs against emulators and for tests.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<SecretString, CredentialError> {
        Ok(self.0.clone())
    }
}
