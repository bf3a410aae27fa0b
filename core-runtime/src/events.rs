//! # Event Bus System
//!
//! Event-driven communication between tracker modules using
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus decouples the reconciliation pass from everything that
//! reacts to its outcome. The scheduler emits lifecycle events; library
//! change events fan out once per affected track. Consumers subscribe
//! independently, and a failing or slow consumer never affects the pass
//! that produced the event.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, LibraryEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Library(LibraryEvent::TrackAdded {
//!         track_id: "https://soundcloud.com/artist/track".to_string(),
//!         title: "Artist - Track".to_string(),
//!         artist: "Artist".to_string(),
//!     }))
//!     .ok();
//!
//! let received = stream.recv().await.unwrap();
//! assert!(matches!(received, CoreEvent::Library(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` can produce two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber can continue with newer events.
//! - **`RecvError::Closed`**: all senders have been dropped. Treat as a
//!   shutdown signal.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of
/// events (a large playlist can produce one `TrackAdded` per track in a
/// single pass). Subscribers that can't keep up receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Reconciliation pass lifecycle events
    Reconcile(ReconcileEvent),
    /// Library content change events
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Reconcile(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Reconcile(ReconcileEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Reconcile(ReconcileEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::TrackRemoved { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Reconcile Events
// ============================================================================

/// Events describing the lifecycle of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ReconcileEvent {
    /// A pass started against the given playlist.
    Started {
        /// Unique identifier for this pass.
        pass_id: String,
        /// Playlist URL being reconciled.
        playlist_url: String,
    },
    /// A pass finished successfully.
    Completed {
        /// The pass identifier.
        pass_id: String,
        /// Tracks currently in the playlist.
        current_count: u64,
        /// Tracks ever observed.
        all_count: u64,
        /// Tracks currently absent from the playlist.
        removed_count: u64,
        /// Tracks first observed in this pass.
        new_tracks: u64,
        /// Tracks that left the playlist in this pass.
        removed_tracks: u64,
    },
    /// A pass stopped on an error.
    Failed {
        /// The pass identifier.
        pass_id: String,
        /// Human-readable error message.
        message: String,
        /// Whether the next scheduled pass is expected to succeed
        /// (fetch failures are transient, store failures may not be).
        recoverable: bool,
    },
}

impl ReconcileEvent {
    fn description(&self) -> &str {
        match self {
            ReconcileEvent::Started { .. } => "Reconciliation started",
            ReconcileEvent::Completed { .. } => "Reconciliation completed",
            ReconcileEvent::Failed { .. } => "Reconciliation failed",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events describing track-level changes observed by a pass.
///
/// `TrackAdded` doubles as the hook for best-effort side work (e.g. archival
/// downloads): consumers subscribe and act on their own schedule, and their
/// failures never reach the reconciliation result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A track appeared in the playlist for the first time.
    TrackAdded {
        /// Permalink URL identifying the track.
        track_id: String,
        /// Combined display title.
        title: String,
        /// Artist display name.
        artist: String,
    },
    /// A previously present track left the playlist.
    TrackRemoved {
        /// Permalink URL identifying the track.
        track_id: String,
        /// Combined display title.
        title: String,
    },
    /// A previously removed track reappeared in the playlist.
    TrackReturned {
        /// Permalink URL identifying the track.
        track_id: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::TrackAdded { .. } => "Track added to playlist",
            LibraryEvent::TrackRemoved { .. } => "Track removed from playlist",
            LibraryEvent::TrackReturned { .. } => "Track returned to playlist",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers; callers that
    /// don't care use `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Library(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
