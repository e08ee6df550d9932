//! Paginated Spotify Web API client.
//!
//! Endpoints used here page with `limit`/`offset`. [`paginate`] hides the
//! paging from callers and asks the token manager for a bearer token before
//! every page.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use tunebridge_core::{MusicServiceError, Result};
use url::Url;

use crate::http::HttpExecutor;
use crate::oauth::SpotifyTokenManager;

/// Largest page the Web API serves for library endpoints.
pub const PAGE_LIMIT: usize = 50;

// ============================================================================
// Spotify API Response Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPagingResponse<T> {
    /// Entries can be `null` for content that is no longer available.
    pub items: Vec<Option<T>>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySavedAlbum {
    pub added_at: Option<String>,
    pub album: SpotifyAlbum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
    pub total_tracks: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner: SpotifyUser,
    /// Sent as `null` for playlists without a cover.
    pub images: Option<Vec<SpotifyImage>>,
    pub tracks: Option<SpotifyTracksRef>,
    #[serde(default)]
    pub collaborative: bool,
    pub public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTracksRef {
    pub total: u32,
}

// ============================================================================
// Pagination
// ============================================================================

/// Fetch pages of `limit` entries until a page comes back short.
///
/// `fetch_page` receives `(offset, limit)`. A page with exactly `limit`
/// entries is always followed by another request, so a collection whose size
/// is a multiple of `limit` ends with an empty page.
pub async fn paginate<T, F, Fut>(limit: usize, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    if limit == 0 {
        return Err(MusicServiceError::InvalidRequest);
    }

    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch_page(offset, limit).await?;
        let count = page.len();
        items.extend(page);
        debug!("Fetched page at offset {} with {} entries", offset, count);

        if count != limit {
            break;
        }
        offset += limit;
    }

    Ok(items)
}

// ============================================================================
// API Client
// ============================================================================

/// Authenticated client for the library endpoints.
pub struct SpotifyApiClient {
    executor: HttpExecutor,
    tokens: Arc<SpotifyTokenManager>,
    base_url: Url,
}

impl SpotifyApiClient {
    pub fn new(executor: HttpExecutor, tokens: Arc<SpotifyTokenManager>, base_url: Url) -> Self {
        Self {
            executor,
            tokens,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// All albums saved in the user's library, in the order the API returns them.
    pub async fn saved_albums(&self) -> Result<Vec<SpotifySavedAlbum>> {
        let entries: Vec<Option<SpotifySavedAlbum>> =
            paginate(PAGE_LIMIT, |offset, limit| self.get_page("me/albums", offset, limit)).await?;
        Ok(entries.into_iter().flatten().collect())
    }

    /// All playlists the user owns or follows.
    pub async fn user_playlists(&self) -> Result<Vec<SpotifyPlaylist>> {
        let entries: Vec<Option<SpotifyPlaylist>> =
            paginate(PAGE_LIMIT, |offset, limit| self.get_page("me/playlists", offset, limit)).await?;
        Ok(entries.into_iter().flatten().collect())
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Option<T>>> {
        // A refresh may happen between pages, so the token is fetched each time.
        let token = self.tokens.get_access_token().await?;
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|_| MusicServiceError::InvalidRequest)?;

        let request = self
            .executor
            .client()
            .get(url)
            .bearer_auth(token)
            .query(&[("limit", limit), ("offset", offset)]);
        let page: SpotifyPagingResponse<T> = self.executor.perform(request).await?;
        Ok(page.items)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
