//! Domain models for the tracked playlist
//!
//! One record type flows through all three record sets; status metadata
//! distinguishes lifecycle stages.

use crate::error::StoreError;
use bridge_traits::source::PlaylistTrack;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Substituted when the platform does not report an artist.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Substituted when the platform does not report an album/set title.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Fixed rendering for persisted timestamps, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Status & Record Sets
// =============================================================================

/// Lifecycle status of a track within the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TrackStatus {
    /// Present in the latest snapshot
    Active,
    /// Absent from the latest snapshot, retained in the ledger
    Removed,
}

impl TrackStatus {
    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Active => "active",
            TrackStatus::Removed => "removed",
        }
    }
}

impl FromStr for TrackStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(TrackStatus::Active),
            "removed" => Ok(TrackStatus::Removed),
            _ => Err(StoreError::InvalidInput {
                field: "status".to_string(),
                message: format!("unknown status '{}'", s),
            }),
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the three persistent record sets.
///
/// - `Current` mirrors the latest snapshot exactly
/// - `All` is the historical ledger; it never shrinks
/// - `Removed` mirrors the removed subset of `All`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSet {
    Current,
    All,
    Removed,
}

impl RecordSet {
    /// Backing table name for this record set.
    pub fn table(&self) -> &'static str {
        match self {
            RecordSet::Current => "current_tracks",
            RecordSet::All => "all_tracks",
            RecordSet::Removed => "removed_tracks",
        }
    }

    /// Get the string representation used in API paths
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSet::Current => "current",
            RecordSet::All => "all",
            RecordSet::Removed => "removed",
        }
    }
}

impl FromStr for RecordSet {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current" => Ok(RecordSet::Current),
            "all" => Ok(RecordSet::All),
            "removed" => Ok(RecordSet::Removed),
            _ => Err(StoreError::InvalidInput {
                field: "set".to_string(),
                message: format!(
                    "unknown record set '{}', expected one of: current, all, removed",
                    s
                ),
            }),
        }
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Track Record
// =============================================================================

/// One track as known at a point in time.
///
/// The permalink URL doubles as the stable identifier; it is the primary key
/// in every record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TrackRecord {
    /// Canonical permalink URL; unique key across all record sets
    pub id: String,
    /// Combined display title, `"<artist> - <track title>"`
    pub title: String,
    /// Artist display name
    pub artist: String,
    /// Duration in seconds, two-decimal precision; 0 when unknown
    pub duration_seconds: f64,
    /// Canonical URL, equal to `id`
    pub permalink_url: String,
    /// Unix seconds of the most recent pass that observed or touched this record
    pub last_updated: i64,
    /// Playlist URL the track was last observed in
    pub playlist_source: String,
    /// Lifecycle status
    pub status: TrackStatus,
    /// Unix seconds of removal; present only while removed
    pub removed_at: Option<i64>,
    /// Position within the playlist when last observed
    pub track_number: Option<i64>,
    /// Album or set title when reported
    pub album: Option<String>,
}

impl TrackRecord {
    /// Build an active record from one fetched playlist track.
    ///
    /// Missing optional fields get their documented defaults: duration 0,
    /// artist "Unknown Artist", album "Unknown Album".
    pub fn from_playlist_track(track: &PlaylistTrack, playlist_url: &str, ts: i64) -> Self {
        let artist = track
            .artist
            .clone()
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let duration_seconds = track
            .duration_ms
            .map(|ms| (ms as f64 / 10.0).round() / 100.0)
            .unwrap_or(0.0);

        Self {
            id: track.permalink_url.clone(),
            title: format!("{} - {}", artist, track.title),
            artist,
            duration_seconds,
            permalink_url: track.permalink_url.clone(),
            last_updated: ts,
            playlist_source: playlist_url.to_string(),
            status: TrackStatus::Active,
            removed_at: None,
            track_number: track.track_number.map(|n| n as i64),
            album: Some(
                track
                    .album
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            ),
        }
    }

    /// Render a Unix timestamp in the fixed `YYYY-MM-DD HH:MM:SS` form (UTC).
    pub fn format_timestamp(ts: i64) -> String {
        chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| ts.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> PlaylistTrack {
        PlaylistTrack {
            title: "Midnight Run".to_string(),
            artist: Some("DJ Example".to_string()),
            duration_ms: Some(215_430),
            permalink_url: "https://soundcloud.com/dj-example/midnight-run".to_string(),
            track_number: Some(3),
            album: Some("Night Drives".to_string()),
        }
    }

    #[test]
    fn test_record_from_playlist_track() {
        let record = TrackRecord::from_playlist_track(
            &sample_track(),
            "https://soundcloud.com/u/sets/p",
            1_700_000_000,
        );

        assert_eq!(record.id, record.permalink_url);
        assert_eq!(record.title, "DJ Example - Midnight Run");
        assert_eq!(record.duration_seconds, 215.43);
        assert_eq!(record.status, TrackStatus::Active);
        assert_eq!(record.removed_at, None);
        assert_eq!(record.track_number, Some(3));
        assert_eq!(record.last_updated, 1_700_000_000);
    }

    #[test]
    fn test_record_defaults_for_missing_fields() {
        let track = PlaylistTrack {
            title: "Untitled".to_string(),
            artist: None,
            duration_ms: None,
            permalink_url: "https://soundcloud.com/x/untitled".to_string(),
            track_number: None,
            album: None,
        };
        let record = TrackRecord::from_playlist_track(&track, "url", 0);

        assert_eq!(record.artist, UNKNOWN_ARTIST);
        assert_eq!(record.title, "Unknown Artist - Untitled");
        assert_eq!(record.duration_seconds, 0.0);
        assert_eq!(record.album.as_deref(), Some(UNKNOWN_ALBUM));
        assert_eq!(record.track_number, None);
    }

    #[test]
    fn test_record_set_parsing() {
        assert_eq!("current".parse::<RecordSet>().unwrap(), RecordSet::Current);
        assert_eq!("ALL".parse::<RecordSet>().unwrap(), RecordSet::All);
        assert_eq!("removed".parse::<RecordSet>().unwrap(), RecordSet::Removed);
        assert!("archive".parse::<RecordSet>().is_err());
    }

    #[test]
    fn test_status_roundtrip() {
        assert_eq!("active".parse::<TrackStatus>().unwrap(), TrackStatus::Active);
        assert_eq!(TrackStatus::Removed.as_str(), "removed");
        assert!("gone".parse::<TrackStatus>().is_err());
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(
            TrackRecord::format_timestamp(1_700_000_000),
            "2023-11-14 22:13:20"
        );
    }
}
