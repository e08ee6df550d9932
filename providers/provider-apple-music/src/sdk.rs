//! The seam to the platform's MusicKit SDK.
//!
//! The host binds [`MusicKit`] to the native framework. Everything the
//! provider knows about Apple Music comes through this trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Library access the user has granted this application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

/// An artwork object as handed out by the SDK.
pub trait SdkArtwork: Send + Sync + fmt::Debug {
    /// URL of the image rendered at `width` x `height`.
    fn url(&self, width: u32, height: u32) -> Option<Url>;
}

/// Artwork described by an Apple Music URL template.
///
/// `{w}` and `{h}` in the template are replaced by the requested size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateArtwork {
    pub template: String,
}

impl TemplateArtwork {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl SdkArtwork for TemplateArtwork {
    fn url(&self, width: u32, height: u32) -> Option<Url> {
        let raw = self
            .template
            .replace("{w}", &width.to_string())
            .replace("{h}", &height.to_string());
        Url::parse(&raw).ok()
    }
}

/// Limits applied to a library request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryRequest {
    /// Maximum number of entries to return.
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct LibraryAlbum {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub artwork: Option<Arc<dyn SdkArtwork>>,
    pub release_date: Option<NaiveDate>,
    pub library_added_date: Option<DateTime<Utc>>,
    pub track_count: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct LibraryPlaylist {
    pub id: String,
    pub name: String,
    pub curator_name: Option<String>,
    pub description: Option<String>,
    pub artwork: Option<Arc<dyn SdkArtwork>>,
    pub track_count: Option<u32>,
    pub library_added_date: Option<DateTime<Utc>>,
}

/// An error reported by the SDK itself, with its native error code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("MusicKit error {code}: {message}")]
pub struct SdkError {
    pub code: i64,
    pub message: String,
}

impl SdkError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Operations the provider needs from MusicKit.
///
/// Library calls may fail with any error. An [`SdkError`] keeps its code when
/// it crosses into the provider; a [`tunebridge_core::MusicServiceError`]
/// passes through unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MusicKit: Send + Sync {
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompt the user if needed and return the resulting status.
    async fn request_authorization(&self) -> AuthorizationStatus;

    async fn library_albums(&self, request: LibraryRequest) -> anyhow::Result<Vec<LibraryAlbum>>;

    async fn library_playlists(&self, request: LibraryRequest) -> anyhow::Result<Vec<LibraryPlaylist>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_artwork_substitution() {
        let artwork = TemplateArtwork::new("https://is1-ssl.mzstatic.com/image/thumb/abc/{w}x{h}bb.jpg");
        assert_eq!(
            artwork.url(300, 300).unwrap().as_str(),
            "https://is1-ssl.mzstatic.com/image/thumb/abc/300x300bb.jpg"
        );
    }

    #[test]
    fn test_template_artwork_invalid() {
        assert!(TemplateArtwork::new("not a url {w}").url(600, 600).is_none());
    }

    #[test]
    fn test_sdk_error_display() {
        let err = SdkError::new(-7007, "Cloud library unavailable");
        assert_eq!(err.to_string(), "MusicKit error -7007: Cloud library unavailable");
    }
}
