//! # Reconcile Engine
//!
//! Applies one playlist snapshot to the three record sets.
//!
//! ## Algorithm
//!
//! Given a non-empty snapshot and a single pass timestamp:
//!
//! 1. Insert snapshot ids unknown to the ledger into `all` as active records
//! 2. Replace the contents of `current` with the snapshot, transactionally,
//!    so readers never observe an empty or partial window
//! 3. Mark ledger ids absent from the snapshot as removed (stamping
//!    `removed_at`) and mirror their records into `removed`
//! 4. Mark every snapshot id active in `all` with one bulk statement,
//!    clearing `removed_at` for tracks that returned
//! 5. Delete snapshot ids from `removed`
//!
//! Step 4 must run after step 3: an id is in exactly one of the two diff
//! sets, and this order keeps the removed mirror correct at every
//! intermediate point for concurrent readers.
//!
//! All mutations in one pass share the timestamp captured at pass start, so
//! records touched by the same pass are comparably stamped.
//!
//! ## Failure semantics
//!
//! An empty snapshot is rejected outright. A store failure aborts the
//! remaining steps and is surfaced to the scheduler; completed steps stay
//! applied (no transaction spans record sets), which the next successful
//! pass converges away. Re-running with an unchanged snapshot only advances
//! timestamps.

use crate::error::{ReconcileError, Result};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use core_store::{RecordSet, RecordStore, TrackRecord, TrackStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Tracks currently in the playlist
    pub current_count: i64,
    /// Tracks ever observed
    pub all_count: i64,
    /// Tracks currently absent from the playlist
    pub removed_count: i64,
    /// Tracks first observed in this pass
    pub new_tracks: u64,
    /// Tracks that left the playlist in this pass
    pub removed_tracks: u64,
}

/// The diff-and-apply engine over a [`RecordStore`].
///
/// The engine performs no fetching and no scheduling; it consumes a snapshot
/// someone else obtained and runs its steps sequentially within one pass.
/// Cloning shares the underlying store and bus.
#[derive(Clone)]
pub struct ReconcileEngine {
    store: Arc<dyn RecordStore>,
    event_bus: EventBus,
}

impl ReconcileEngine {
    /// Create a new engine over the given store.
    pub fn new(store: Arc<dyn RecordStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Apply one snapshot, stamping every mutation with `pass_ts`.
    ///
    /// Duplicate ids within the snapshot are collapsed, first occurrence
    /// wins. Snapshot records are normalized to active status with
    /// `last_updated = pass_ts` regardless of what the caller set.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::EmptySnapshot`] for an empty snapshot, with no
    ///   store mutation
    /// - [`ReconcileError::Store`] if a store operation fails mid-pass
    #[instrument(skip(self, snapshot), fields(snapshot_len = snapshot.len()))]
    pub async fn reconcile(
        &self,
        snapshot: &[TrackRecord],
        pass_ts: i64,
    ) -> Result<ReconcileSummary> {
        if snapshot.is_empty() {
            return Err(ReconcileError::EmptySnapshot);
        }

        // Collapse duplicate ids, keeping playlist order, and normalize to
        // the shared pass timestamp.
        let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());
        let snapshot: Vec<TrackRecord> = snapshot
            .iter()
            .filter(|r| seen.insert(r.id.as_str()))
            .map(|r| TrackRecord {
                status: TrackStatus::Active,
                removed_at: None,
                last_updated: pass_ts,
                ..r.clone()
            })
            .collect();

        let snapshot_ids: Vec<String> = snapshot.iter().map(|r| r.id.clone()).collect();
        let snapshot_id_set: HashSet<&str> = snapshot_ids.iter().map(String::as_str).collect();

        let existing_ids = self.store.list_ids(RecordSet::All).await?;
        let previously_removed = self.store.list_ids(RecordSet::Removed).await?;

        // New tracks: first time this id appears in any snapshot
        let new_records: Vec<TrackRecord> = snapshot
            .iter()
            .filter(|r| !existing_ids.contains(&r.id))
            .cloned()
            .collect();
        if !new_records.is_empty() {
            self.store
                .upsert_many(RecordSet::All, &new_records)
                .await?;
        }

        // Current always mirrors the latest snapshot exactly, including
        // ordering fields that change between fetches.
        self.store.replace_all(RecordSet::Current, &snapshot).await?;

        // Tracks that left the playlist: flip status in the ledger and
        // mirror into the removed set.
        let removed_ids: Vec<String> = existing_ids
            .iter()
            .filter(|id| !snapshot_id_set.contains(id.as_str()))
            .cloned()
            .collect();
        let mut departed: Vec<TrackRecord> = Vec::new();
        if !removed_ids.is_empty() {
            departed = self.store.fetch_by_ids(RecordSet::All, &removed_ids).await?;
            self.store
                .update_status_bulk(RecordSet::All, &removed_ids, TrackStatus::Removed, pass_ts)
                .await?;

            for record in &mut departed {
                record.status = TrackStatus::Removed;
                record.removed_at = Some(pass_ts);
                record.last_updated = pass_ts;
            }
            self.store.upsert_many(RecordSet::Removed, &departed).await?;
        }

        // Every present id becomes active in one bulk statement; this also
        // clears removed_at for tracks that returned. Runs after the
        // removal step so an id can never end the pass in both states.
        self.store
            .update_status_bulk(RecordSet::All, &snapshot_ids, TrackStatus::Active, pass_ts)
            .await?;

        // A track that came back must not linger in the removed mirror.
        self.store
            .delete_by_ids(RecordSet::Removed, &snapshot_ids)
            .await?;

        let summary = ReconcileSummary {
            current_count: self.store.count(RecordSet::Current).await?,
            all_count: self.store.count(RecordSet::All).await?,
            removed_count: self.store.count(RecordSet::Removed).await?,
            new_tracks: new_records.len() as u64,
            removed_tracks: removed_ids.len() as u64,
        };

        self.emit_track_events(&snapshot, &new_records, &departed, &previously_removed);

        info!(
            current = summary.current_count,
            all = summary.all_count,
            removed = summary.removed_count,
            new = summary.new_tracks,
            departed = summary.removed_tracks,
            "Reconciliation pass applied"
        );

        Ok(summary)
    }

    /// Fan out per-track change events. Consumers (archival downloads and
    /// the like) subscribe independently; nothing here can fail the pass.
    fn emit_track_events(
        &self,
        snapshot: &[TrackRecord],
        new_records: &[TrackRecord],
        departed: &[TrackRecord],
        previously_removed: &HashSet<String>,
    ) {
        for record in new_records {
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::TrackAdded {
                    track_id: record.id.clone(),
                    title: record.title.clone(),
                    artist: record.artist.clone(),
                }))
                .ok();
        }

        for record in departed {
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::TrackRemoved {
                    track_id: record.id.clone(),
                    title: record.title.clone(),
                }))
                .ok();
        }

        for record in snapshot {
            if previously_removed.contains(&record.id) {
                debug!(track_id = %record.id, "Track returned to playlist");
                self.event_bus
                    .emit(CoreEvent::Library(LibraryEvent::TrackReturned {
                        track_id: record.id.clone(),
                    }))
                    .ok();
            }
        }
    }
}
