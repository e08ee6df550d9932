//! Unified library and client wiring tests with in-process providers.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use provider_spotify::consent::ChannelConsentFlow;
use std::sync::Arc;
use tunebridge_cli::config::Config;
use tunebridge_cli::registry::ProviderRegistry;
use tunebridge_cli::unified::UnifiedLibrary;
use tunebridge_cli::Tunebridge;
use tunebridge_core::prelude::*;
use tunebridge_credentials::{keys, CredentialStore, FileCredentialStore, MemoryCredentialStore};

/// Provider with a canned library and authorization state.
struct FakeProvider {
    provider_type: MusicProviderType,
    authorized: bool,
    albums: Result<Vec<CanonicalAlbum>>,
}

impl FakeProvider {
    fn with_albums(provider_type: MusicProviderType, albums: Vec<CanonicalAlbum>) -> Self {
        Self {
            provider_type,
            authorized: true,
            albums: Ok(albums),
        }
    }

    fn failing(provider_type: MusicProviderType, error: MusicServiceError) -> Self {
        Self {
            provider_type,
            authorized: true,
            albums: Err(error),
        }
    }

    fn unauthorized(provider_type: MusicProviderType) -> Self {
        Self {
            provider_type,
            authorized: false,
            albums: Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl MusicProvider for FakeProvider {
    fn provider_type(&self) -> MusicProviderType {
        self.provider_type
    }

    async fn is_authorized(&self) -> bool {
        self.authorized
    }

    async fn authorize(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_albums(&self) -> Result<Vec<CanonicalAlbum>> {
        if !self.authorized {
            return Err(MusicServiceError::NotAuthorized);
        }
        self.albums.clone()
    }

    async fn fetch_playlists(&self) -> Result<Vec<CanonicalPlaylist>> {
        Ok(Vec::new())
    }

    fn deep_link(&self, item: LibraryItem<'_>) -> Option<DeepLink> {
        deeplink::deep_link(item)
    }
}

fn album(provider: MusicProviderType, id: &str, day: Option<u32>) -> CanonicalAlbum {
    let mut album = CanonicalAlbum::new(provider, id, format!("Album {id}"), "Artist");
    album.library_added_date = day.and_then(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).single());
    album
}

#[tokio::test]
async fn test_merges_albums_from_all_providers() {
    let mut registry = ProviderRegistry::new();
    registry.register(FakeProvider::with_albums(
        MusicProviderType::AppleMusic,
        vec![
            album(MusicProviderType::AppleMusic, "a1", Some(2)),
            album(MusicProviderType::AppleMusic, "a2", None),
        ],
    ));
    registry.register(FakeProvider::with_albums(
        MusicProviderType::Spotify,
        vec![album(MusicProviderType::Spotify, "s1", Some(9))],
    ));

    let library = UnifiedLibrary::new(Arc::new(registry));
    let result = library.albums(None).await;

    let ids: Vec<&str> = result.items.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "a1", "a2"]);
    assert!(result.failures.is_empty());
    assert!(result.unauthorized.is_empty());
}

#[tokio::test]
async fn test_provider_failure_does_not_fail_view() {
    let mut registry = ProviderRegistry::new();
    registry.register(FakeProvider::failing(
        MusicProviderType::Spotify,
        MusicServiceError::RateLimitExceeded(Some(30)),
    ));
    registry.register(FakeProvider::with_albums(
        MusicProviderType::AppleMusic,
        vec![album(MusicProviderType::AppleMusic, "a1", Some(1))],
    ));

    let result = UnifiedLibrary::new(Arc::new(registry)).albums(None).await;

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].provider, MusicProviderType::Spotify);
    assert_eq!(result.failures[0].error, MusicServiceError::RateLimitExceeded(Some(30)));
}

#[tokio::test]
async fn test_unauthorized_providers_are_skipped() {
    let mut registry = ProviderRegistry::new();
    registry.register(FakeProvider::unauthorized(MusicProviderType::Spotify));

    let result = UnifiedLibrary::new(Arc::new(registry)).albums(None).await;

    assert!(result.items.is_empty());
    assert!(result.failures.is_empty());
    assert_eq!(result.unauthorized, vec![MusicProviderType::Spotify]);
}

#[tokio::test]
async fn test_provider_filter() {
    let mut registry = ProviderRegistry::new();
    registry.register(FakeProvider::with_albums(
        MusicProviderType::AppleMusic,
        vec![album(MusicProviderType::AppleMusic, "a1", Some(1))],
    ));
    registry.register(FakeProvider::with_albums(
        MusicProviderType::Spotify,
        vec![album(MusicProviderType::Spotify, "s1", Some(2))],
    ));

    let result = UnifiedLibrary::new(Arc::new(registry))
        .albums(Some(MusicProviderType::AppleMusic))
        .await;

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].source_provider, MusicProviderType::AppleMusic);
}

#[tokio::test]
async fn test_result_serializes_camel_case() {
    let mut registry = ProviderRegistry::new();
    registry.register(FakeProvider::failing(
        MusicProviderType::Spotify,
        MusicServiceError::NotAuthorized,
    ));

    let result = UnifiedLibrary::new(Arc::new(registry)).albums(None).await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["failures"][0]["provider"], "spotify");
    assert!(json["failures"][0]["message"].is_string());
    assert!(json["failures"][0].get("error").is_none());
    assert!(json["unauthorized"].as_array().unwrap().is_empty());
}

fn spotify_config() -> Config {
    let mut config = Config::default();
    config.spotify.enabled = true;
    config.spotify.client_id = "client-123".to_string();
    config
}

#[tokio::test]
async fn test_client_wiring_and_status() {
    let store = Arc::new(MemoryCredentialStore::new());
    let (consent, _requests) = ChannelConsentFlow::new();
    let app = Tunebridge::from_config(&spotify_config(), store, Arc::new(consent), None).unwrap();

    assert_eq!(app.registry().list(), vec![MusicProviderType::Spotify]);

    let statuses = app.status().await;
    assert_eq!(statuses.len(), 2);
    let apple = statuses
        .iter()
        .find(|s| s.provider == MusicProviderType::AppleMusic)
        .unwrap();
    assert!(!apple.configured);
    let spotify = statuses
        .iter()
        .find(|s| s.provider == MusicProviderType::Spotify)
        .unwrap();
    assert!(spotify.configured);
    assert!(!spotify.authorized);
}

#[tokio::test]
async fn test_status_reports_token_expiry() {
    let expiry = Utc::now() + chrono::Duration::hours(1);
    let store = Arc::new(
        MemoryCredentialStore::new()
            .with_value(keys::ACCESS_TOKEN, "access")
            .with_value(keys::REFRESH_TOKEN, "refresh")
            .with_value(keys::TOKEN_EXPIRY, &expiry.to_rfc3339()),
    );
    let (consent, _requests) = ChannelConsentFlow::new();
    let app = Tunebridge::from_config(&spotify_config(), store, Arc::new(consent), None).unwrap();

    let spotify = app
        .status()
        .await
        .into_iter()
        .find(|s| s.provider == MusicProviderType::Spotify)
        .unwrap();
    assert!(spotify.authorized);
    assert_eq!(
        spotify.token_expiry.map(|e| e.timestamp()),
        Some(expiry.timestamp())
    );
}

#[tokio::test]
async fn test_logout_with_file_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("credentials.json");
    let store = Arc::new(FileCredentialStore::new(path.clone()));
    let expiry = (Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
    store.store("access", keys::ACCESS_TOKEN).await.unwrap();
    store.store(&expiry, keys::TOKEN_EXPIRY).await.unwrap();

    let (consent, _requests) = ChannelConsentFlow::new();
    let app = Tunebridge::from_config(&spotify_config(), store.clone(), Arc::new(consent), None).unwrap();

    assert!(app.registry().get(MusicProviderType::Spotify).unwrap().is_authorized().await);
    app.logout(MusicProviderType::Spotify).await.unwrap();
    assert!(!store.exists(keys::ACCESS_TOKEN).await);

    // A fresh store over the same file sees the removal.
    let reopened = FileCredentialStore::new(path);
    assert!(!reopened.exists(keys::TOKEN_EXPIRY).await);

    assert!(app.logout(MusicProviderType::AppleMusic).await.is_err());
}

#[tokio::test]
async fn test_disabled_spotify_is_not_registered() {
    let (consent, _requests) = ChannelConsentFlow::new();
    let app = Tunebridge::from_config(
        &Config::default(),
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(consent),
        None,
    )
    .unwrap();

    assert_eq!(app.registry().count(), 0);
    assert!(app.authorize(MusicProviderType::Spotify).await.is_err());

    // Deep links still work for unconfigured providers.
    let album = CanonicalAlbum::new(MusicProviderType::Spotify, "4aawyAB9vmqN3uQ7FjRGTy", "", "");
    let link = app.registry().deep_link(LibraryItem::Album(&album)).unwrap();
    assert_eq!(link.app_url.as_str(), "spotify:album:4aawyAB9vmqN3uQ7FjRGTy");
}
