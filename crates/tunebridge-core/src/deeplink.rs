//! Deep links into the providers' native apps.
//!
//! Builders are pure and provider-specific. [`deep_link`] dispatches on the
//! item's own `source_provider`, so it can be called with entries from any
//! provider.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{LibraryItem, MusicProviderType};

/// A link that opens a library entry in a provider's app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLink {
    /// Native app URL.
    pub app_url: Url,
    /// Web URL to use when the app is not installed.
    pub web_url: Option<Url>,
}

/// Build a deep link for `item` using the builder of its own provider.
pub fn deep_link(item: LibraryItem<'_>) -> Option<DeepLink> {
    match item.source_provider() {
        MusicProviderType::AppleMusic => apple_music(item),
        MusicProviderType::Spotify => spotify(item),
    }
}

/// Apple Music link: `music://` app scheme with an `https://` web fallback.
///
/// Uses the item's Apple Music ID; items without one get no link.
pub fn apple_music(item: LibraryItem<'_>) -> Option<DeepLink> {
    let id = item.provider_ids().apple_music_id.as_deref()?;
    let kind = match item {
        LibraryItem::Album(_) => "albums",
        LibraryItem::Playlist(_) => "playlists",
    };

    let path = format!("music.apple.com/library/{kind}/{id}");
    let app_url = Url::parse(&format!("music://{path}")).ok()?;
    let web_url = Url::parse(&format!("https://{path}")).ok();

    Some(DeepLink { app_url, web_url })
}

/// Spotify link: `spotify:album:<id>` / `spotify:playlist:<id>` URI.
///
/// Uses the item's Spotify ID; items without one get no link.
pub fn spotify(item: LibraryItem<'_>) -> Option<DeepLink> {
    let id = item.provider_ids().spotify_id.as_deref()?;
    let kind = match item {
        LibraryItem::Album(_) => "album",
        LibraryItem::Playlist(_) => "playlist",
    };

    let app_url = Url::parse(&format!("spotify:{kind}:{id}")).ok()?;
    Some(DeepLink { app_url, web_url: None })
}
