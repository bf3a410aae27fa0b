//! Playlist Source Abstraction
//!
//! Defines the contract for fetching the current track listing of a remote
//! playlist. The core consumes this trait without knowing which streaming
//! platform backs it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One track as reported by the remote playlist, in playlist order.
///
/// Optional fields reflect what upstream APIs actually omit; the core
/// substitutes documented defaults when converting to its own records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    /// Track title as reported by the platform
    pub title: String,
    /// Uploader/artist display name, when the platform reports one
    pub artist: Option<String>,
    /// Duration in milliseconds, when known
    pub duration_ms: Option<u64>,
    /// Canonical permalink URL; stable identifier for the track
    pub permalink_url: String,
    /// Position within the playlist (1-based), when reported
    pub track_number: Option<u64>,
    /// Album or set title, when reported
    pub album: Option<String>,
}

/// Playlist source trait
///
/// Implementations fetch the full, ordered track listing of one playlist in
/// a single logical operation. Partial listings must not be returned as
/// success: if the platform cannot deliver the complete playlist, the fetch
/// fails and the caller keeps its last known state.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::source::PlaylistSource;
///
/// async fn snapshot(source: &dyn PlaylistSource, url: &str) -> Result<usize> {
///     let tracks = source.fetch_tracks(url).await?;
///     Ok(tracks.len())
/// }
/// ```
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Fetch the current track listing for the given playlist URL
    ///
    /// Tracks are returned in playlist order.
    ///
    /// # Errors
    ///
    /// Returns error if the playlist cannot be resolved, the platform
    /// rejects the request, or the response cannot be parsed.
    async fn fetch_tracks(&self, playlist_url: &str) -> Result<Vec<PlaylistTrack>>;
}
