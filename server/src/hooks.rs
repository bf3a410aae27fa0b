//! Post-reconciliation event consumers
//!
//! Best-effort side work hangs off the event bus rather than the
//! reconciliation pass itself: a consumer that falls behind or dies never
//! affects the pass result.

use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, RecvError};
use tracing::{info, warn};

/// Subscribe to track changes and log them.
///
/// This is the attachment point for per-track side work such as archival
/// downloads: replace the log line with the actual work, or add another
/// subscriber alongside.
pub fn spawn_track_change_logger(bus: &EventBus) {
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(CoreEvent::Library(LibraryEvent::TrackAdded {
                    track_id,
                    title,
                    artist,
                })) => {
                    info!(track_id = %track_id, title = %title, artist = %artist, "New track in playlist");
                }
                Ok(CoreEvent::Library(LibraryEvent::TrackRemoved { track_id, title })) => {
                    info!(track_id = %track_id, title = %title, "Track left playlist");
                }
                Ok(CoreEvent::Library(LibraryEvent::TrackReturned { track_id })) => {
                    info!(track_id = %track_id, "Track returned to playlist");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Track change logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
