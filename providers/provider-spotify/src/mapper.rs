//! Conversion from Web API payloads into canonical library types.

use chrono::{DateTime, NaiveDate, Utc};
use tunebridge_core::{Artwork, CanonicalAlbum, CanonicalPlaylist, MusicProviderType};
use url::Url;

use crate::api::{SpotifyImage, SpotifyPlaylist, SpotifySavedAlbum};

/// Artist name used when an album lists no artists.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const SMALL_TARGET: u32 = 300;
const MEDIUM_TARGET: u32 = 640;

pub fn album_from_saved(saved: SpotifySavedAlbum) -> CanonicalAlbum {
    let SpotifySavedAlbum { added_at, album } = saved;

    let artist_name = album
        .artists
        .into_iter()
        .next()
        .map(|artist| artist.name)
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let mut canonical = CanonicalAlbum::new(MusicProviderType::Spotify, album.id, album.name, artist_name);
    canonical.artwork = select_artwork(&album.images);
    canonical.release_date = album
        .release_date
        .as_deref()
        .and_then(|date| parse_release_date(date, album.release_date_precision.as_deref()));
    canonical.library_added_date = added_at.as_deref().and_then(parse_timestamp);
    canonical.track_count = album.total_tracks;
    canonical
}

pub fn playlist_from_spotify(playlist: SpotifyPlaylist) -> CanonicalPlaylist {
    let curator = playlist.owner.display_name.unwrap_or(playlist.owner.id);

    let mut canonical = CanonicalPlaylist::new(MusicProviderType::Spotify, playlist.id, playlist.name);
    canonical.curator_name = Some(curator);
    canonical.description = playlist.description.filter(|d| !d.is_empty());
    canonical.artwork = playlist.images.as_deref().and_then(select_artwork);
    canonical.track_count = playlist.tracks.map(|t| t.total);
    canonical.is_collaborative = Some(playlist.collaborative);
    canonical.is_public = playlist.public;
    canonical
}

/// Parse a release date reported at `precision`.
///
/// Year-only dates land on January 1st and month dates on the 1st of the
/// month. Unknown precisions are parsed as full dates.
pub fn parse_release_date(date: &str, precision: Option<&str>) -> Option<NaiveDate> {
    match precision {
        Some("year") => {
            if date.len() != 4 || !date.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let year = date.parse().ok()?;
            NaiveDate::from_ymd_opt(year, 1, 1)
        }
        Some("month") => NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d").ok(),
        _ => NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Pick breakpoint URLs out of the image variants an item ships with.
///
/// Variants are ordered widest first and each target takes the nearest
/// width, with ties going to the wider variant. The widest variant is the
/// large image.
pub fn select_artwork(images: &[SpotifyImage]) -> Option<Artwork> {
    let mut variants: Vec<(u32, Url)> = images
        .iter()
        .filter_map(|image| Url::parse(&image.url).ok().map(|url| (image.width.unwrap_or(0), url)))
        .collect();
    if variants.is_empty() {
        return None;
    }
    // Stable, so equal widths keep the API's order.
    variants.sort_by(|a, b| b.0.cmp(&a.0));

    let nearest = |target: u32| {
        variants
            .iter()
            .min_by_key(|(width, _)| width.abs_diff(target))
            .map(|(_, url)| url.clone())
    };

    let small = nearest(SMALL_TARGET);
    let medium = nearest(MEDIUM_TARGET);
    let large = variants.first().map(|(_, url)| url.clone());

    Artwork::from_breakpoints(small, medium, large)
}
