//! Conversion from SDK library entries into canonical library types.

use tunebridge_core::artwork::{LARGE_BREAKPOINT, MEDIUM_BREAKPOINT, SMALL_BREAKPOINT};
use tunebridge_core::{Artwork, CanonicalAlbum, CanonicalPlaylist, MusicProviderType};

use crate::sdk::{LibraryAlbum, LibraryPlaylist, SdkArtwork};

pub fn album_from_library(album: LibraryAlbum) -> CanonicalAlbum {
    let mut canonical = CanonicalAlbum::new(MusicProviderType::AppleMusic, album.id, album.title, album.artist_name);
    canonical.artwork = album.artwork.and_then(|artwork| artwork_from_sdk(artwork.as_ref()));
    canonical.release_date = album.release_date;
    canonical.library_added_date = album.library_added_date;
    canonical.track_count = album.track_count;
    canonical
}

/// Apple Music has no collaborative or public flags, so both stay `None`.
pub fn playlist_from_library(playlist: LibraryPlaylist) -> CanonicalPlaylist {
    let mut canonical = CanonicalPlaylist::new(MusicProviderType::AppleMusic, playlist.id, playlist.name);
    canonical.curator_name = playlist.curator_name;
    canonical.description = playlist.description;
    canonical.artwork = playlist.artwork.and_then(|artwork| artwork_from_sdk(artwork.as_ref()));
    canonical.track_count = playlist.track_count;
    canonical.library_added_date = playlist.library_added_date;
    canonical
}

/// Render the SDK artwork at the three square breakpoints.
pub fn artwork_from_sdk(artwork: &dyn SdkArtwork) -> Option<Artwork> {
    Artwork::from_breakpoints(
        artwork.url(SMALL_BREAKPOINT, SMALL_BREAKPOINT),
        artwork.url(MEDIUM_BREAKPOINT, MEDIUM_BREAKPOINT),
        artwork.url(LARGE_BREAKPOINT, LARGE_BREAKPOINT),
    )
}
