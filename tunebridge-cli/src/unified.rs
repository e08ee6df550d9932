//! Unified library view across every configured provider.
//!
//! Albums and playlists from all authorized providers are merged into one
//! list, newest additions first. A provider that fails is recorded next to
//! the results instead of failing the whole view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use tunebridge_core::prelude::*;

use crate::registry::ProviderRegistry;

/// A provider whose part of the view could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider: MusicProviderType,
    pub message: String,
    #[serde(skip)]
    pub error: MusicServiceError,
}

/// Merged entries plus what was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResult<T> {
    pub items: Vec<T>,
    /// Providers skipped because they are not authorized.
    pub unauthorized: Vec<MusicProviderType>,
    pub failures: Vec<ProviderFailure>,
}

impl<T> Default for UnifiedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            unauthorized: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Fields the merged ordering looks at.
pub trait LibraryEntry {
    fn added_at(&self) -> Option<DateTime<Utc>>;
    fn sort_title(&self) -> &str;
}

impl LibraryEntry for CanonicalAlbum {
    fn added_at(&self) -> Option<DateTime<Utc>> {
        self.library_added_date
    }

    fn sort_title(&self) -> &str {
        &self.title
    }
}

impl LibraryEntry for CanonicalPlaylist {
    fn added_at(&self) -> Option<DateTime<Utc>> {
        self.library_added_date
    }

    fn sort_title(&self) -> &str {
        &self.name
    }
}

/// Newest first, undated entries last, then by title.
pub fn compare_entries<T: LibraryEntry>(a: &T, b: &T) -> Ordering {
    let by_date = match (a.added_at(), b.added_at()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.sort_title().cmp(b.sort_title()))
}

/// Unified view over a [`ProviderRegistry`].
pub struct UnifiedLibrary {
    registry: Arc<ProviderRegistry>,
}

impl UnifiedLibrary {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Albums from every authorized provider, or only from `filter`.
    pub async fn albums(&self, filter: Option<MusicProviderType>) -> UnifiedResult<CanonicalAlbum> {
        self.collect(filter, |provider| async move { provider.fetch_albums().await })
            .await
    }

    /// Playlists from every authorized provider, or only from `filter`.
    pub async fn playlists(&self, filter: Option<MusicProviderType>) -> UnifiedResult<CanonicalPlaylist> {
        self.collect(filter, |provider| async move { provider.fetch_playlists().await })
            .await
    }

    async fn collect<T, F, Fut>(&self, filter: Option<MusicProviderType>, fetch: F) -> UnifiedResult<T>
    where
        T: LibraryEntry,
        F: Fn(Arc<dyn MusicProvider>) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let mut result = UnifiedResult::default();

        for provider_type in self.registry.list() {
            if filter.is_some_and(|wanted| wanted != provider_type) {
                continue;
            }
            let Some(provider) = self.registry.get(provider_type) else {
                continue;
            };

            if !provider.is_authorized().await {
                debug!("Skipping {}: not authorized", provider_type);
                result.unauthorized.push(provider_type);
                continue;
            }

            match fetch(provider).await {
                Ok(items) => {
                    debug!("{} returned {} entries", provider_type, items.len());
                    result.items.extend(items);
                }
                Err(error) => {
                    warn!("Failed to load library from {}: {}", provider_type, error);
                    result.failures.push(ProviderFailure {
                        provider: provider_type,
                        message: error.to_string(),
                        error,
                    });
                }
            }
        }

        result.items.sort_by(compare_entries);
        result
    }
}
