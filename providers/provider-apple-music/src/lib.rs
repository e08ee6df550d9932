//! # provider-apple-music
//!
//! Apple Music provider for Tunebridge.
//!
//! Reads the user's Apple Music library through the platform MusicKit SDK.
//! The SDK binding is supplied by the host as an implementation of
//! [`MusicKit`]; this crate handles authorization status, result limits,
//! mapping into canonical types and error translation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tunebridge_core::prelude::*;

pub mod mapper;
pub mod sdk;

pub use sdk::{AuthorizationStatus, LibraryRequest, MusicKit, SdkError};

/// Default ceiling on entries returned per library request.
pub const DEFAULT_LIBRARY_LIMIT: usize = 1000;

/// Configuration for the Apple Music provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppleMusicConfig {
    pub library_limit: usize,
}

impl Default for AppleMusicConfig {
    fn default() -> Self {
        Self {
            library_limit: DEFAULT_LIBRARY_LIMIT,
        }
    }
}

/// Translate an error raised by the SDK binding into the core taxonomy.
///
/// A [`MusicServiceError`] passes through as is. An [`SdkError`] keeps its
/// code; anything else is reported with code 0.
pub fn map_sdk_error(err: anyhow::Error) -> MusicServiceError {
    let err = match err.downcast::<MusicServiceError>() {
        Ok(service_error) => return service_error,
        Err(err) => err,
    };

    match err.downcast::<SdkError>() {
        Ok(sdk_error) => MusicServiceError::ProviderSpecific {
            code: sdk_error.code,
            message: sdk_error.message,
        },
        Err(other) => MusicServiceError::ProviderSpecific {
            code: 0,
            message: other.to_string(),
        },
    }
}

/// Apple Music facade over a MusicKit binding.
pub struct AppleMusicProvider {
    kit: Arc<dyn MusicKit>,
    config: AppleMusicConfig,
}

impl AppleMusicProvider {
    pub fn new(kit: Arc<dyn MusicKit>) -> Self {
        Self::with_config(kit, AppleMusicConfig::default())
    }

    pub fn with_config(kit: Arc<dyn MusicKit>, config: AppleMusicConfig) -> Self {
        Self { kit, config }
    }

    pub fn config(&self) -> &AppleMusicConfig {
        &self.config
    }

    fn library_request(&self) -> LibraryRequest {
        LibraryRequest {
            limit: self.config.library_limit,
        }
    }

    async fn ensure_authorized(&self) -> Result<()> {
        if self.is_authorized().await {
            Ok(())
        } else {
            Err(MusicServiceError::NotAuthorized)
        }
    }
}

#[async_trait]
impl MusicProvider for AppleMusicProvider {
    fn provider_type(&self) -> MusicProviderType {
        MusicProviderType::AppleMusic
    }

    async fn is_authorized(&self) -> bool {
        self.kit.authorization_status().await == AuthorizationStatus::Authorized
    }

    async fn authorize(&self) -> Result<()> {
        if self.is_authorized().await {
            debug!("Apple Music access already granted");
            return Ok(());
        }

        info!("Requesting Apple Music authorization");
        match self.kit.request_authorization().await {
            AuthorizationStatus::Authorized => {
                info!("Apple Music authorization granted");
                Ok(())
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                warn!("Apple Music authorization denied");
                Err(MusicServiceError::AuthorizationDenied)
            }
            AuthorizationStatus::NotDetermined => Err(MusicServiceError::AuthorizationFailed(Some(
                "Authorization status is still undetermined".to_string(),
            ))),
        }
    }

    async fn fetch_albums(&self) -> Result<Vec<CanonicalAlbum>> {
        self.ensure_authorized().await?;

        let albums: Vec<CanonicalAlbum> = self
            .kit
            .library_albums(self.library_request())
            .await
            .map_err(map_sdk_error)?
            .into_iter()
            .map(mapper::album_from_library)
            .collect();

        info!("Fetched {} Apple Music albums", albums.len());
        Ok(albums)
    }

    async fn fetch_playlists(&self) -> Result<Vec<CanonicalPlaylist>> {
        self.ensure_authorized().await?;

        let playlists: Vec<CanonicalPlaylist> = self
            .kit
            .library_playlists(self.library_request())
            .await
            .map_err(map_sdk_error)?
            .into_iter()
            .map(mapper::playlist_from_library)
            .collect();

        info!("Fetched {} Apple Music playlists", playlists.len());
        Ok(playlists)
    }

    fn deep_link(&self, item: LibraryItem<'_>) -> Option<DeepLink> {
        deeplink::apple_music(item)
    }
}

// ============================================================================
// Tests
// ============================================================================
