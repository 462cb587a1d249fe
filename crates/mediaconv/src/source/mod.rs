//! Item sources: URL parsing, upstream metadata and registration.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SourceError;
use crate::model::ItemId;

pub mod metadata;
pub mod registration;

pub use metadata::{MetadataSource, YoutubeDataApi};
pub use registration::{register_item, Registration, RegistrationRequest};

static RE_VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|e/|.*[?&]v=)?(?P<id>[A-Za-z0-9_-]{11})$",
    )
    .unwrap()
});

/// Extracts the item identifier from a supported video URL.
///
/// The URL must be absolute (scheme and host) and point at a video on a
/// supported host.
pub fn parse_source_url(raw: &str) -> Result<ItemId, SourceError> {
    let trimmed = raw.trim();
    let parsed =
        reqwest::Url::parse(trimmed).map_err(|_| SourceError::InvalidUrl(raw.to_string()))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(SourceError::InvalidUrl(raw.to_string()));
    }

    let id = RE_VIDEO_URL
        .captures(trimmed)
        .and_then(|caps| caps.name("id"))
        .ok_or_else(|| SourceError::UnsupportedHost(raw.to_string()))?;

    Ok(ItemId::new(id.as_str())?)
}
