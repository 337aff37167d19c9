//! OAuth credential refresh for calendar providers
//!
//! Only the refresh-token grant lives here; the authorization-code dance
//! that produced the refresh token is outside this crate. A provider call
//! always exchanges the stored refresh token for a fresh access token, and
//! a rotated refresh token (Microsoft issues these) is persisted back.

use std::sync::Arc;

use async_trait::async_trait;
use hourglass_domain::{HourglassError, ProviderKind, Result};
use serde::Deserialize;
use tracing::debug;

/// Persistence for per-provider refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn refresh_token(&self, user_id: &str, kind: ProviderKind) -> Result<Option<String>>;

    async fn store_refresh_token(
        &self,
        user_id: &str,
        kind: ProviderKind,
        token: &str,
    ) -> Result<()>;
}

/// OAuth client settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl ProviderCredentials {
    pub fn google(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    pub fn outlook(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[allow(dead_code)]
    expires_in: Option<i64>,
}

/// Exchanges stored refresh tokens for access tokens.
pub struct CredentialManager {
    http: reqwest::Client,
    store: Arc<dyn RefreshTokenStore>,
    google: Option<ProviderCredentials>,
    outlook: Option<ProviderCredentials>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn RefreshTokenStore>,
        google: Option<ProviderCredentials>,
        outlook: Option<ProviderCredentials>,
    ) -> Self {
        Self { http: super::http_client(), store, google, outlook }
    }

    /// A valid access token for `user_id` on the given provider.
    ///
    /// Fails with an authentication error when the provider is not
    /// configured, the user never connected it, or the refresh grant is
    /// rejected.
    pub async fn access_token(&self, user_id: &str, kind: ProviderKind) -> Result<String> {
        let credentials = match kind {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Outlook => self.outlook.as_ref(),
        }
        .ok_or_else(|| {
            HourglassError::Auth(format!("{} provider not configured", kind.as_str()))
        })?;

        let refresh_token =
            self.store.refresh_token(user_id, kind).await?.ok_or_else(|| {
                HourglassError::Auth(format!("user not connected to {}", kind.as_str()))
            })?;

        let response = self
            .http
            .post(&credentials.token_url)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| {
                HourglassError::Auth(format!("token refresh request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(HourglassError::Auth(format!(
                "token refresh failed ({status}): {body}"
            )));
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            HourglassError::Auth(format!("failed to parse token response: {e}"))
        })?;

        // Some providers rotate the refresh token on every grant
        if let Some(rotated) = tokens.refresh_token.as_deref() {
            if rotated != refresh_token {
                debug!(provider = kind.as_str(), "persisting rotated refresh token");
                self.store.store_refresh_token(user_id, kind, rotated).await?;
            }
        }

        Ok(tokens.access_token)
    }
}
