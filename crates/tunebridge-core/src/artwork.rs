//! Artwork with resolution fallbacks.
//!
//! Providers describe artwork in one of two ways: a URL template containing
//! `{w}` and `{h}` placeholders, or a handful of pre-sized URLs. [`Artwork`]
//! holds either (or both) and resolves a URL for any requested size.

use serde::{Deserialize, Serialize};
use url::Url;

/// Target width of the small breakpoint.
pub const SMALL_BREAKPOINT: u32 = 300;
/// Target width of the medium breakpoint.
pub const MEDIUM_BREAKPOINT: u32 = 600;
/// Target width of the large breakpoint.
pub const LARGE_BREAKPOINT: u32 = 1200;

/// Widths below this resolve to the small breakpoint first.
const MEDIUM_BAND_START: u32 = 450;
/// Widths at or above this resolve to the large breakpoint first.
const LARGE_BAND_START: u32 = 900;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    /// URL with literal `{w}` and `{h}` placeholders.
    pub url_template: Option<String>,
    pub small_url: Option<Url>,
    pub medium_url: Option<Url>,
    pub large_url: Option<Url>,
}

impl Artwork {
    /// Artwork described only by fixed breakpoint URLs.
    ///
    /// Returns `None` when none of the three URLs is present.
    pub fn from_breakpoints(small: Option<Url>, medium: Option<Url>, large: Option<Url>) -> Option<Self> {
        if small.is_none() && medium.is_none() && large.is_none() {
            return None;
        }

        Some(Self {
            url_template: None,
            small_url: small,
            medium_url: medium,
            large_url: large,
        })
    }

    /// Artwork described by a size template.
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            url_template: Some(template.into()),
            ..Self::default()
        }
    }

    /// Whether any resolution path exists.
    pub fn is_resolvable(&self) -> bool {
        self.url_template.is_some()
            || self.small_url.is_some()
            || self.medium_url.is_some()
            || self.large_url.is_some()
    }

    /// Resolve a URL for the requested size.
    ///
    /// The template wins when present. Otherwise the breakpoint nearest the
    /// requested width is preferred, falling back to the others in a fixed
    /// order per width band.
    pub fn url(&self, width: u32, height: u32) -> Option<Url> {
        if let Some(template) = &self.url_template {
            let resolved = template
                .replace("{w}", &width.to_string())
                .replace("{h}", &height.to_string());
            if let Ok(url) = Url::parse(&resolved) {
                return Some(url);
            }
        }

        let order = if width < MEDIUM_BAND_START {
            [&self.small_url, &self.medium_url, &self.large_url]
        } else if width < LARGE_BAND_START {
            [&self.medium_url, &self.large_url, &self.small_url]
        } else {
            [&self.large_url, &self.medium_url, &self.small_url]
        };

        order.into_iter().flatten().next().cloned()
    }
}
