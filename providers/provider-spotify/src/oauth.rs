//! OAuth 2.0 authorization-code flow with PKCE, and the token lifecycle.
//!
//! [`SpotifyTokenManager`] owns the persisted token state (access token,
//! refresh token, expiry) and keeps a valid bearer token available on demand.
//! Token state lives in a [`CredentialStore`] under the keys in
//! [`tunebridge_credentials::keys`].

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tunebridge_core::{MusicServiceError, Result};
use tunebridge_credentials::{keys, CredentialStore};
use url::Url;

use crate::consent::ConsentFlow;
use crate::http::HttpExecutor;
use crate::SpotifyConfig;

/// A token with less validity left than this is treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Number of random bytes behind each code verifier.
const VERIFIER_BYTES: usize = 64;

// ============================================================================
// PKCE Helpers
// ============================================================================

/// Generate a PKCE code verifier: URL-safe base64 of random bytes, no padding.
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive the S256 code challenge for `verifier`.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build the URL of the consent screen.
pub fn build_authorization_url(config: &SpotifyConfig, code_challenge: &str) -> Url {
    let mut url = config.authorize_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("code_challenge_method", "S256")
        .append_pair("code_challenge", code_challenge)
        .append_pair("scope", &config.scopes.join(" "));
    url
}

/// Pull the authorization code out of the redirect the provider sent back.
pub fn extract_authorization_code(callback: &Url) -> Result<String> {
    let mut code = None;
    let mut error = None;
    for (key, value) in callback.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(MusicServiceError::AuthorizationFailed(Some(error)));
    }

    code.ok_or_else(|| {
        MusicServiceError::AuthorizationFailed(Some("Callback URL has no authorization code".to_string()))
    })
}

/// Whether a token expiring at `expiry` must be refreshed at `now`.
///
/// Exactly [`EXPIRY_MARGIN_SECS`] of remaining validity still counts as valid.
pub fn is_expired(expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expiry - now < Duration::seconds(EXPIRY_MARGIN_SECS)
}

// ============================================================================
// Token Endpoint Types
// ============================================================================

/// Token endpoint response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

// ============================================================================
// Token Manager
// ============================================================================

/// Manages authorization and the persisted Spotify token state.
///
/// All reads and writes of the token state go through one async mutex, so
/// concurrent callers that find an expired token trigger a single refresh.
pub struct SpotifyTokenManager {
    config: Arc<SpotifyConfig>,
    executor: HttpExecutor,
    store: Arc<dyn CredentialStore>,
    consent: Arc<dyn ConsentFlow>,
    state_lock: Mutex<()>,
}

impl SpotifyTokenManager {
    pub fn new(
        config: Arc<SpotifyConfig>,
        executor: HttpExecutor,
        store: Arc<dyn CredentialStore>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Self {
        Self {
            config,
            executor,
            store,
            consent,
            state_lock: Mutex::new(()),
        }
    }

    /// Whether a usable token is available, refreshing it if needed.
    ///
    /// A failed refresh reads as `false`.
    pub async fn is_authorized(&self) -> bool {
        let _guard = self.state_lock.lock().await;

        if !self.store.exists(keys::ACCESS_TOKEN).await {
            return false;
        }
        if !self.stored_token_expired().await {
            return true;
        }

        match self.refresh_locked().await {
            Ok(()) => self.store.exists(keys::ACCESS_TOKEN).await,
            Err(e) => {
                warn!("Spotify token refresh during authorization check failed: {}", e);
                false
            }
        }
    }

    /// Run the PKCE authorization flow and persist the resulting tokens.
    pub async fn authorize(&self) -> Result<()> {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        let authorize_url = build_authorization_url(&self.config, &challenge);

        info!("Starting Spotify authorization");
        let callback = self
            .consent
            .present(&authorize_url, &self.config.redirect_uri)
            .await?;
        let code = extract_authorization_code(&callback)?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        form.push(("code_verifier", verifier.as_str()));

        let request = self
            .executor
            .client()
            .post(self.config.token_url.clone())
            .form(&form);
        let response: TokenResponse = self.executor.perform(request).await?;

        let _guard = self.state_lock.lock().await;
        self.persist(&response, false).await?;
        info!("Spotify authorization complete");
        Ok(())
    }

    /// Return a bearer token with at least the expiry margin left.
    pub async fn get_access_token(&self) -> Result<String> {
        let _guard = self.state_lock.lock().await;

        let Some(token) = self.store.retrieve(keys::ACCESS_TOKEN).await else {
            return Err(MusicServiceError::NotAuthorized);
        };
        if !self.stored_token_expired().await {
            return Ok(token);
        }

        self.refresh_locked().await?;
        self.store
            .retrieve(keys::ACCESS_TOKEN)
            .await
            .ok_or(MusicServiceError::TokenRefreshFailed)
    }

    /// Remove all persisted token state. Succeeds when nothing is stored.
    pub async fn deauthorize(&self) -> Result<()> {
        let _guard = self.state_lock.lock().await;

        // The access token goes first so a partial failure never leaves it usable.
        self.store.delete(keys::ACCESS_TOKEN).await?;
        self.store.delete(keys::TOKEN_EXPIRY).await?;
        self.store.delete(keys::REFRESH_TOKEN).await?;

        info!("Spotify authorization removed");
        Ok(())
    }

    /// The stored expiry, if present and parseable.
    ///
    /// Waits for any refresh in progress.
    pub async fn token_expiry(&self) -> Option<DateTime<Utc>> {
        let _guard = self.state_lock.lock().await;
        self.stored_expiry().await
    }

    /// Callers hold `state_lock`.
    async fn stored_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.retrieve(keys::TOKEN_EXPIRY).await?;
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    async fn stored_token_expired(&self) -> bool {
        match self.stored_expiry().await {
            Some(expiry) => is_expired(expiry, Utc::now()),
            None => true,
        }
    }

    /// Refresh the access token. Callers hold `state_lock`.
    async fn refresh_locked(&self) -> Result<()> {
        let refresh_token = self
            .store
            .retrieve(keys::REFRESH_TOKEN)
            .await
            .ok_or(MusicServiceError::TokenRefreshFailed)?;

        debug!("Refreshing Spotify access token");
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let request = self
            .executor
            .client()
            .post(self.config.token_url.clone())
            .form(&form);
        let response: TokenResponse = self.executor.perform(request).await.map_err(|e| {
            warn!("Spotify token refresh failed: {}", e);
            MusicServiceError::TokenRefreshFailed
        })?;

        self.persist(&response, true).await
    }

    /// Write a token response to the store. Callers hold `state_lock`.
    ///
    /// A response without a refresh token keeps the stored one when
    /// `keep_refresh_token` is set and clears it otherwise.
    async fn persist(&self, response: &TokenResponse, keep_refresh_token: bool) -> Result<()> {
        let expiry = token_expiry_from(Utc::now(), response.expires_in)?;

        self.store.store(&expiry.to_rfc3339(), keys::TOKEN_EXPIRY).await?;
        self.store.store(&response.access_token, keys::ACCESS_TOKEN).await?;
        match &response.refresh_token {
            Some(refresh_token) => self.store.store(refresh_token, keys::REFRESH_TOKEN).await?,
            None if !keep_refresh_token => {
                self.store.delete(keys::REFRESH_TOKEN).await?;
            }
            None => {}
        }

        debug!("Stored Spotify token valid until {}", expiry);
        Ok(())
    }
}

/// Absolute expiry for a token granted at `now` with `expires_in` seconds.
fn token_expiry_from(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            MusicServiceError::InvalidData(format!("token lifetime out of range: {expires_in}s"))
        })
}
