//! # tunebridge-core
//!
//! Core traits and types shared by every Tunebridge music provider.
//!
//! This crate defines the provider-agnostic view of a user's music library:
//!
//! - [`CanonicalAlbum`] / [`CanonicalPlaylist`] - library entries normalized from any provider
//! - [`Artwork`] - artwork with a size template and/or fixed breakpoint URLs
//! - [`MusicProvider`] - the capability trait every provider facade implements
//! - [`deeplink`] - pure deep-link builders and tag-based dispatch
//! - [`MusicServiceError`] - the error taxonomy surfaced by all providers

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod artwork;
pub mod deeplink;

pub use artwork::Artwork;
pub use deeplink::DeepLink;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicServiceError {
    #[error("Authorization denied by the user")]
    AuthorizationDenied,

    #[error("Authorization failed{}", .0.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
    AuthorizationFailed(Option<String>),

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response")]
    InvalidResponse,

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("API error {status}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Api { status: u16, message: Option<String> },

    #[error("Rate limit exceeded{}", .0.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    RateLimitExceeded(Option<u64>),

    #[error("Invalid request")]
    InvalidRequest,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token refresh failed")]
    TokenRefreshFailed,

    #[error("Token storage error: {0}")]
    TokenStorage(String),

    #[error("No data")]
    NoData,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Provider error {code}: {message}")]
    ProviderSpecific { code: i64, message: String },

    #[error("Unknown error{}", .0.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
    Unknown(Option<String>),
}

pub type Result<T> = std::result::Result<T, MusicServiceError>;

// ============================================================================
// Provider Identity
// ============================================================================

/// The streaming services Tunebridge can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MusicProviderType {
    AppleMusic,
    Spotify,
}

impl MusicProviderType {
    pub const ALL: [MusicProviderType; 2] = [MusicProviderType::AppleMusic, MusicProviderType::Spotify];

    /// Stable identifier, e.g. for config sections and CLI arguments.
    pub fn id(&self) -> &'static str {
        match self {
            MusicProviderType::AppleMusic => "apple-music",
            MusicProviderType::Spotify => "spotify",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MusicProviderType::AppleMusic => "Apple Music",
            MusicProviderType::Spotify => "Spotify",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }
}

impl fmt::Display for MusicProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Per-provider identifiers of a library entry.
///
/// Exactly one field is populated, matching the entry's `source_provider`.
/// Build values with [`ProviderIds::for_provider`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderIds {
    pub apple_music_id: Option<String>,
    pub spotify_id: Option<String>,
}

impl ProviderIds {
    pub fn for_provider(provider: MusicProviderType, id: impl Into<String>) -> Self {
        let id = id.into();
        match provider {
            MusicProviderType::AppleMusic => Self {
                apple_music_id: Some(id),
                spotify_id: None,
            },
            MusicProviderType::Spotify => Self {
                apple_music_id: None,
                spotify_id: Some(id),
            },
        }
    }

    pub fn id_for(&self, provider: MusicProviderType) -> Option<&str> {
        match provider {
            MusicProviderType::AppleMusic => self.apple_music_id.as_deref(),
            MusicProviderType::Spotify => self.spotify_id.as_deref(),
        }
    }
}

// ============================================================================
// Canonical Model
// ============================================================================

/// An album saved in the user's library, normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAlbum {
    /// Provider-local identifier, unique within `source_provider`.
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub artwork: Option<Artwork>,
    /// Release date degraded to the precision the provider reported
    /// (a year-only date becomes January 1st).
    pub release_date: Option<NaiveDate>,
    pub library_added_date: Option<DateTime<Utc>>,
    pub track_count: Option<u32>,
    pub source_provider: MusicProviderType,
    pub provider_ids: ProviderIds,
}

impl CanonicalAlbum {
    /// Create an album with only the required fields set.
    pub fn new(
        provider: MusicProviderType,
        id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            provider_ids: ProviderIds::for_provider(provider, id.clone()),
            id,
            title: title.into(),
            artist_name: artist_name.into(),
            artwork: None,
            release_date: None,
            library_added_date: None,
            track_count: None,
            source_provider: provider,
        }
    }
}

/// A playlist in the user's library, normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPlaylist {
    pub id: String,
    pub name: String,
    pub curator_name: Option<String>,
    pub description: Option<String>,
    pub artwork: Option<Artwork>,
    pub track_count: Option<u32>,
    pub library_added_date: Option<DateTime<Utc>>,
    pub source_provider: MusicProviderType,
    pub provider_ids: ProviderIds,
    /// Only reported by providers that support collaborative playlists.
    pub is_collaborative: Option<bool>,
    /// Only reported by providers with public/private playlists.
    pub is_public: Option<bool>,
}

impl CanonicalPlaylist {
    /// Create a playlist with only the required fields set.
    pub fn new(provider: MusicProviderType, id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            provider_ids: ProviderIds::for_provider(provider, id.clone()),
            id,
            name: name.into(),
            curator_name: None,
            description: None,
            artwork: None,
            track_count: None,
            library_added_date: None,
            source_provider: provider,
            is_collaborative: None,
            is_public: None,
        }
    }
}

/// A reference to either kind of library entry, used for deep links.
#[derive(Debug, Clone, Copy)]
pub enum LibraryItem<'a> {
    Album(&'a CanonicalAlbum),
    Playlist(&'a CanonicalPlaylist),
}

impl LibraryItem<'_> {
    pub fn source_provider(&self) -> MusicProviderType {
        match self {
            LibraryItem::Album(album) => album.source_provider,
            LibraryItem::Playlist(playlist) => playlist.source_provider,
        }
    }

    pub fn provider_ids(&self) -> &ProviderIds {
        match self {
            LibraryItem::Album(album) => &album.provider_ids,
            LibraryItem::Playlist(playlist) => &playlist.provider_ids,
        }
    }
}

impl<'a> From<&'a CanonicalAlbum> for LibraryItem<'a> {
    fn from(album: &'a CanonicalAlbum) -> Self {
        LibraryItem::Album(album)
    }
}

impl<'a> From<&'a CanonicalPlaylist> for LibraryItem<'a> {
    fn from(playlist: &'a CanonicalPlaylist) -> Self {
        LibraryItem::Playlist(playlist)
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// The capability set every provider facade exposes.
///
/// Implementations must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait MusicProvider: Send + Sync {
    /// Which service this provider talks to.
    fn provider_type(&self) -> MusicProviderType;

    /// Whether the provider currently holds usable authorization.
    ///
    /// Never fails; any failure while checking reads as `false`.
    async fn is_authorized(&self) -> bool;

    /// Run the provider's interactive authorization flow.
    async fn authorize(&self) -> Result<()>;

    /// Fetch every album saved in the user's library.
    async fn fetch_albums(&self) -> Result<Vec<CanonicalAlbum>>;

    /// Fetch every playlist in the user's library.
    async fn fetch_playlists(&self) -> Result<Vec<CanonicalPlaylist>>;

    /// Build a link that opens `item` in this provider's app.
    fn deep_link(&self, item: LibraryItem<'_>) -> Option<DeepLink>;
}

// ============================================================================
// Re-exports
// ============================================================================

pub mod prelude {
    pub use crate::{
        deeplink, Artwork, CanonicalAlbum, CanonicalPlaylist, DeepLink, LibraryItem, MusicProvider,
        MusicProviderType, MusicServiceError, ProviderIds, Result,
    };
}

// ============================================================================
// Tests
// ============================================================================
