//! SoundCloud API response types
//!
//! Data structures for deserializing SoundCloud API v2 responses. The API
//! has no published schema; fields mirror what the web app actually
//! receives, with everything non-essential optional.

use serde::Deserialize;

/// A resolved playlist resource
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPlaylist {
    /// Numeric playlist id
    pub id: u64,

    /// Resource kind; `"playlist"` for playlists, used to reject URLs that
    /// resolve to tracks or users
    #[serde(default)]
    pub kind: Option<String>,

    /// Playlist title
    #[serde(default)]
    pub title: Option<String>,

    /// Declared number of tracks; entries past the first few arrive as
    /// stubs that need hydration
    #[serde(default)]
    pub track_count: Option<u64>,

    /// Track entries in playlist order
    #[serde(default)]
    pub tracks: Vec<ApiTrack>,
}

/// A track resource, possibly a stub
///
/// Playlists embed full data only for their first few tracks; the rest
/// carry just an id and must be hydrated via `/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    /// Numeric track id; always present, even on stubs
    pub id: u64,

    /// Track title
    #[serde(default)]
    pub title: Option<String>,

    /// Duration in milliseconds
    #[serde(default)]
    pub duration: Option<u64>,

    /// Canonical permalink URL
    #[serde(default)]
    pub permalink_url: Option<String>,

    /// Uploader
    #[serde(default)]
    pub user: Option<ApiUser>,
}

impl ApiTrack {
    /// Stub entries lack everything except the id and need hydration.
    pub fn is_stub(&self) -> bool {
        self.permalink_url.is_none() || self.title.is_none()
    }
}

/// A user resource attached to a track
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    /// Display name of the uploader
    #[serde(default)]
    pub username: Option<String>,
}
