//! # provider-spotify
//!
//! Spotify provider for Tunebridge.
//!
//! This provider reads the user's library through the Web API:
//! - Saved albums
//! - Playlists the user owns or follows
//!
//! ## Authentication
//!
//! Authorization uses the OAuth 2.0 authorization-code flow with PKCE. The
//! consent screen is shown by the host application through a
//! [`ConsentFlow`](consent::ConsentFlow). Tokens are persisted in a
//! [`CredentialStore`] and refreshed transparently before they expire.
//!
//! ## API Coverage
//!
//! - GET /me/albums - List saved albums
//! - GET /me/playlists - List the user's playlists

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use tunebridge_core::prelude::*;
use tunebridge_credentials::CredentialStore;
use url::Url;

pub mod api;
pub mod consent;
pub mod http;
pub mod mapper;
pub mod oauth;

use api::SpotifyApiClient;
use consent::ConsentFlow;
use http::HttpExecutor;
use oauth::SpotifyTokenManager;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1/";

/// Scopes needed to read saved albums and private or collaborative playlists.
pub const DEFAULT_SCOPES: [&str; 3] = [
    "user-library-read",
    "playlist-read-private",
    "playlist-read-collaborative",
];

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the Spotify provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyConfig {
    pub client_id: String,
    /// Only needed for apps registered as confidential clients.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: Url,
    pub token_url: Url,
    pub api_base_url: Url,
}

impl SpotifyConfig {
    /// Configuration against the public Spotify endpoints with default scopes.
    ///
    /// Fails with [`MusicServiceError::InvalidData`] if `redirect_uri` is not
    /// an absolute URL.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Result<Self> {
        let redirect_uri = redirect_uri.into();
        Url::parse(&redirect_uri)
            .map_err(|e| MusicServiceError::InvalidData(format!("Invalid redirect URI '{redirect_uri}': {e}")))?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: parse_endpoint(DEFAULT_AUTHORIZE_URL)?,
            token_url: parse_endpoint(DEFAULT_TOKEN_URL)?,
            api_base_url: parse_endpoint(DEFAULT_API_BASE_URL)?,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| MusicServiceError::InvalidData(format!("Invalid endpoint '{raw}': {e}")))
}

// ============================================================================
// Spotify Provider
// ============================================================================

/// Spotify facade over the token manager and the paginated API client.
pub struct SpotifyProvider {
    tokens: Arc<SpotifyTokenManager>,
    api: SpotifyApiClient,
}

impl SpotifyProvider {
    /// Create a provider with a default HTTP client.
    pub fn new(
        config: SpotifyConfig,
        store: Arc<dyn CredentialStore>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Result<Self> {
        Ok(Self::with_executor(config, HttpExecutor::new()?, store, consent))
    }

    pub fn with_executor(
        config: SpotifyConfig,
        executor: HttpExecutor,
        store: Arc<dyn CredentialStore>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Self {
        let api_base_url = config.api_base_url.clone();
        let tokens = Arc::new(SpotifyTokenManager::new(
            Arc::new(config),
            executor.clone(),
            store,
            consent,
        ));
        let api = SpotifyApiClient::new(executor, Arc::clone(&tokens), api_base_url);

        Self { tokens, api }
    }

    pub fn token_manager(&self) -> &SpotifyTokenManager {
        &self.tokens
    }

    /// Forget all stored tokens.
    pub async fn deauthorize(&self) -> Result<()> {
        self.tokens.deauthorize().await
    }

    async fn ensure_authorized(&self) -> Result<()> {
        if self.tokens.is_authorized().await {
            Ok(())
        } else {
            Err(MusicServiceError::NotAuthorized)
        }
    }
}

#[async_trait]
impl MusicProvider for SpotifyProvider {
    fn provider_type(&self) -> MusicProviderType {
        MusicProviderType::Spotify
    }

    async fn is_authorized(&self) -> bool {
        self.tokens.is_authorized().await
    }

    async fn authorize(&self) -> Result<()> {
        self.tokens.authorize().await
    }

    async fn fetch_albums(&self) -> Result<Vec<CanonicalAlbum>> {
        self.ensure_authorized().await?;

        let albums: Vec<CanonicalAlbum> = self
            .api
            .saved_albums()
            .await?
            .into_iter()
            .map(mapper::album_from_saved)
            .collect();

        info!("Fetched {} Spotify albums", albums.len());
        Ok(albums)
    }

    async fn fetch_playlists(&self) -> Result<Vec<CanonicalPlaylist>> {
        self.ensure_authorized().await?;

        let playlists: Vec<CanonicalPlaylist> = self
            .api
            .user_playlists()
            .await?
            .into_iter()
            .map(mapper::playlist_from_spotify)
            .collect();

        info!("Fetched {} Spotify playlists", playlists.len());
        Ok(playlists)
    }

    fn deep_link(&self, item: LibraryItem<'_>) -> Option<DeepLink> {
        let link = deeplink::spotify(item);
        if link.is_none() {
            debug!("No Spotify id on item, cannot build deep link");
        }
        link
    }
}

// ============================================================================
// Tests
// ============================================================================
