//! Integration tests for the reconciliation workflow
//!
//! These tests drive the engine and scheduler against a real in-memory
//! store and verify:
//! - New/removed/returning track transitions across consecutive passes
//! - The removed mirror staying in sync with the ledger
//! - Idempotence and empty-snapshot safety
//! - Busy-flag semantics of the scheduler
//! - Partial-failure surfacing when the store errors mid-pass

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::source::{PlaylistSource, PlaylistTrack};
use core_reconcile::{ReconcileEngine, ReconcileError, UpdateScheduler};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use core_store::{
    create_test_pool, RecordSet, RecordStore, SqliteRecordStore, TrackRecord, TrackStatus,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const PLAYLIST: &str = "https://soundcloud.com/tester/sets/late-night";

fn track(id: &str) -> PlaylistTrack {
    PlaylistTrack {
        title: format!("Track {}", id),
        artist: Some("Tester".to_string()),
        duration_ms: Some(180_000),
        permalink_url: format!("https://soundcloud.com/tester/{}", id),
        track_number: None,
        album: None,
    }
}

fn snapshot(ids: &[&str], ts: i64) -> Vec<TrackRecord> {
    ids.iter()
        .map(|id| TrackRecord::from_playlist_track(&track(id), PLAYLIST, ts))
        .collect()
}

fn full_id(id: &str) -> String {
    format!("https://soundcloud.com/tester/{}", id)
}

async fn setup() -> (ReconcileEngine, Arc<SqliteRecordStore>, EventBus) {
    let pool = create_test_pool().await.unwrap();
    let store = Arc::new(SqliteRecordStore::new(pool));
    let bus = EventBus::new(256);
    let engine = ReconcileEngine::new(store.clone() as Arc<dyn RecordStore>, bus.clone());
    (engine, store, bus)
}

/// The removed set must always equal the removed-status subset of the ledger.
async fn assert_mirror_invariant(store: &SqliteRecordStore) {
    let removed_set = store.list_ids(RecordSet::Removed).await.unwrap();
    let all_ids = store.list_ids(RecordSet::All).await.unwrap();
    let all_records = store
        .fetch_by_ids(RecordSet::All, &all_ids.into_iter().collect::<Vec<_>>())
        .await
        .unwrap();
    let ledger_removed: HashSet<String> = all_records
        .iter()
        .filter(|r| r.status == TrackStatus::Removed)
        .map(|r| r.id.clone())
        .collect();

    assert_eq!(removed_set, ledger_removed, "removed mirror out of sync");
}

#[tokio::test]
async fn test_initial_pass_populates_all_sets() {
    let (engine, store, _bus) = setup().await;

    let summary = engine.reconcile(&snapshot(&["a", "b"], 100), 100).await.unwrap();

    assert_eq!(summary.current_count, 2);
    assert_eq!(summary.all_count, 2);
    assert_eq!(summary.removed_count, 0);
    assert_eq!(summary.new_tracks, 2);
    assert_eq!(summary.removed_tracks, 0);

    let current = store.list_ids(RecordSet::Current).await.unwrap();
    assert_eq!(
        current,
        HashSet::from([full_id("a"), full_id("b")])
    );
    assert_mirror_invariant(&store).await;
}

#[tokio::test]
async fn test_departed_track_moves_to_removed() {
    let (engine, store, _bus) = setup().await;
    engine.reconcile(&snapshot(&["a", "b"], 100), 100).await.unwrap();

    let summary = engine.reconcile(&snapshot(&["a", "c"], 200), 200).await.unwrap();

    assert_eq!(summary.current_count, 2);
    assert_eq!(summary.all_count, 3);
    assert_eq!(summary.removed_count, 1);
    assert_eq!(summary.new_tracks, 1);
    assert_eq!(summary.removed_tracks, 1);

    let current = store.list_ids(RecordSet::Current).await.unwrap();
    assert_eq!(current, HashSet::from([full_id("a"), full_id("c")]));

    let removed = store.list_ids(RecordSet::Removed).await.unwrap();
    assert_eq!(removed, HashSet::from([full_id("b")]));

    let b = &store
        .fetch_by_ids(RecordSet::All, &[full_id("b")])
        .await
        .unwrap()[0];
    assert_eq!(b.status, TrackStatus::Removed);
    assert_eq!(b.removed_at, Some(200));
    assert_eq!(b.last_updated, 200);

    // Records the pass touched all carry the shared pass timestamp
    let a = &store
        .fetch_by_ids(RecordSet::All, &[full_id("a")])
        .await
        .unwrap()[0];
    assert_eq!(a.last_updated, 200);

    assert_mirror_invariant(&store).await;
}

#[tokio::test]
async fn test_returning_track_leaves_removed() {
    let (engine, store, _bus) = setup().await;
    engine.reconcile(&snapshot(&["a", "b"], 100), 100).await.unwrap();
    engine.reconcile(&snapshot(&["a", "c"], 200), 200).await.unwrap();

    let summary = engine
        .reconcile(&snapshot(&["a", "b", "c"], 300), 300)
        .await
        .unwrap();

    assert_eq!(summary.new_tracks, 0);
    assert_eq!(summary.removed_tracks, 0);
    assert_eq!(summary.removed_count, 0);
    assert_eq!(summary.all_count, 3);

    let b = &store
        .fetch_by_ids(RecordSet::All, &[full_id("b")])
        .await
        .unwrap()[0];
    assert_eq!(b.status, TrackStatus::Active);
    assert_eq!(b.removed_at, None);
    assert_eq!(b.last_updated, 300);

    assert!(store.list_ids(RecordSet::Removed).await.unwrap().is_empty());
    assert_mirror_invariant(&store).await;
}

#[tokio::test]
async fn test_idempotent_for_unchanged_snapshot() {
    let (engine, store, _bus) = setup().await;
    engine.reconcile(&snapshot(&["a", "b"], 100), 100).await.unwrap();

    let before_current = store.list_ids(RecordSet::Current).await.unwrap();
    let before_all = store.list_ids(RecordSet::All).await.unwrap();

    let summary = engine.reconcile(&snapshot(&["a", "b"], 150), 150).await.unwrap();

    assert_eq!(summary.new_tracks, 0);
    assert_eq!(summary.removed_tracks, 0);
    assert_eq!(store.list_ids(RecordSet::Current).await.unwrap(), before_current);
    assert_eq!(store.list_ids(RecordSet::All).await.unwrap(), before_all);
    assert!(store.list_ids(RecordSet::Removed).await.unwrap().is_empty());

    // Timestamps advance even though the sets do not
    let a = &store
        .fetch_by_ids(RecordSet::All, &[full_id("a")])
        .await
        .unwrap()[0];
    assert_eq!(a.last_updated, 150);
}

#[tokio::test]
async fn test_empty_snapshot_never_erases_state() {
    let (engine, store, _bus) = setup().await;
    engine.reconcile(&snapshot(&["a", "b"], 100), 100).await.unwrap();

    let result = engine.reconcile(&[], 200).await;
    assert!(matches!(result, Err(ReconcileError::EmptySnapshot)));

    assert_eq!(store.count(RecordSet::Current).await.unwrap(), 2);
    assert_eq!(store.count(RecordSet::All).await.unwrap(), 2);
    assert_eq!(store.count(RecordSet::Removed).await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_snapshot_ids_collapse() {
    let (engine, store, _bus) = setup().await;

    let mut doubled = snapshot(&["a"], 100);
    doubled.extend(snapshot(&["a", "b"], 100));

    let summary = engine.reconcile(&doubled, 100).await.unwrap();
    assert_eq!(summary.current_count, 2);
    assert_eq!(summary.new_tracks, 2);
    assert_eq!(store.count(RecordSet::Current).await.unwrap(), 2);
}

#[tokio::test]
async fn test_track_added_events_emitted() {
    let (engine, _store, bus) = setup().await;
    let mut rx = bus.subscribe();

    engine.reconcile(&snapshot(&["a", "b"], 100), 100).await.unwrap();

    let mut added = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Library(LibraryEvent::TrackAdded { track_id, .. }) = event {
            added.push(track_id);
        }
    }
    added.sort();
    assert_eq!(added, vec![full_id("a"), full_id("b")]);
}

// ============================================================================
// Store failure surfacing
// ============================================================================

/// Store wrapper that fails the bulk activation step, simulating a mid-pass
/// database error.
struct FailingStore {
    inner: SqliteRecordStore,
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn list_ids(
        &self,
        set: RecordSet,
    ) -> core_store::Result<HashSet<String>> {
        self.inner.list_ids(set).await
    }

    async fn fetch_by_ids(
        &self,
        set: RecordSet,
        ids: &[String],
    ) -> core_store::Result<Vec<TrackRecord>> {
        self.inner.fetch_by_ids(set, ids).await
    }

    async fn upsert_many(
        &self,
        set: RecordSet,
        records: &[TrackRecord],
    ) -> core_store::Result<()> {
        self.inner.upsert_many(set, records).await
    }

    async fn replace_all(
        &self,
        set: RecordSet,
        records: &[TrackRecord],
    ) -> core_store::Result<()> {
        self.inner.replace_all(set, records).await
    }

    async fn delete_all(&self, set: RecordSet) -> core_store::Result<u64> {
        self.inner.delete_all(set).await
    }

    async fn delete_by_ids(&self, set: RecordSet, ids: &[String]) -> core_store::Result<u64> {
        self.inner.delete_by_ids(set, ids).await
    }

    async fn update_status_bulk(
        &self,
        set: RecordSet,
        ids: &[String],
        status: TrackStatus,
        ts: i64,
    ) -> core_store::Result<u64> {
        if status == TrackStatus::Active {
            return Err(core_store::StoreError::InvalidInput {
                field: "simulated".to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.inner.update_status_bulk(set, ids, status, ts).await
    }

    async fn count(&self, set: RecordSet) -> core_store::Result<i64> {
        self.inner.count(set).await
    }

    async fn count_by_status(
        &self,
        set: RecordSet,
        status: TrackStatus,
    ) -> core_store::Result<i64> {
        self.inner.count_by_status(set, status).await
    }
}

#[tokio::test]
async fn test_store_failure_aborts_pass_but_keeps_current_populated() {
    let pool = create_test_pool().await.unwrap();
    let failing = Arc::new(FailingStore {
        inner: SqliteRecordStore::new(pool.clone()),
    });
    let probe = SqliteRecordStore::new(pool);
    let engine = ReconcileEngine::new(failing as Arc<dyn RecordStore>, EventBus::new(16));

    let result = engine.reconcile(&snapshot(&["a", "b"], 100), 100).await;
    assert!(matches!(result, Err(ReconcileError::Store(_))));

    // Steps before the failure stayed applied; current is never left empty
    // for a non-empty snapshot.
    assert_eq!(probe.count(RecordSet::Current).await.unwrap(), 2);
    assert_eq!(probe.count(RecordSet::All).await.unwrap(), 2);
}

// ============================================================================
// Scheduler behavior
// ============================================================================

/// Source whose fetch takes long enough to observe the busy flag.
struct SlowSource {
    delay: Duration,
}

#[async_trait]
impl PlaylistSource for SlowSource {
    async fn fetch_tracks(
        &self,
        _playlist_url: &str,
    ) -> bridge_traits::error::Result<Vec<PlaylistTrack>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![track("a"), track("b")])
    }
}

/// Source that always fails, simulating an unreachable platform.
struct FailingSource;

#[async_trait]
impl PlaylistSource for FailingSource {
    async fn fetch_tracks(
        &self,
        _playlist_url: &str,
    ) -> bridge_traits::error::Result<Vec<PlaylistTrack>> {
        Err(BridgeError::OperationFailed("connection refused".to_string()))
    }
}

async fn scheduler_with(
    source: Arc<dyn PlaylistSource>,
) -> (Arc<UpdateScheduler>, Arc<SqliteRecordStore>) {
    let pool = create_test_pool().await.unwrap();
    let store = Arc::new(SqliteRecordStore::new(pool));
    let bus = EventBus::new(256);
    let engine = ReconcileEngine::new(store.clone() as Arc<dyn RecordStore>, bus.clone());
    let scheduler = Arc::new(UpdateScheduler::new(
        engine,
        source,
        bus,
        PLAYLIST,
        Duration::from_secs(300),
    ));
    (scheduler, store)
}

async fn wait_until_idle(scheduler: &Arc<UpdateScheduler>) -> core_reconcile::UpdateStatus {
    for _ in 0..500 {
        let status = scheduler.status().await;
        if !status.busy {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scheduler did not go idle in time");
}

#[tokio::test]
async fn test_concurrent_trigger_rejected_with_busy() {
    let (scheduler, store) = scheduler_with(Arc::new(SlowSource {
        delay: Duration::from_millis(200),
    }))
    .await;

    scheduler.try_trigger().await.unwrap();

    let second = scheduler.try_trigger().await;
    assert!(matches!(second, Err(ReconcileError::Busy)));
    assert!(scheduler.status().await.busy);

    let status = wait_until_idle(&scheduler).await;
    let summary = status.last_result.expect("pass should have completed");
    assert_eq!(summary.current_count, 2);
    assert!(status.last_error.is_none());
    assert!(status.last_run_at.is_some());
    assert_eq!(store.count(RecordSet::Current).await.unwrap(), 2);

    // Flag cleared: a new trigger is accepted again
    scheduler.try_trigger().await.unwrap();
    wait_until_idle(&scheduler).await;
}

#[tokio::test]
async fn test_fetch_failure_is_non_destructive_and_reported() {
    let (scheduler, store) = scheduler_with(Arc::new(SlowSource {
        delay: Duration::from_millis(1),
    }))
    .await;

    // Seed state through a successful pass first
    scheduler.try_trigger().await.unwrap();
    wait_until_idle(&scheduler).await;
    assert_eq!(store.count(RecordSet::Current).await.unwrap(), 2);

    let (failing_scheduler, _) = scheduler_with(Arc::new(FailingSource)).await;
    failing_scheduler.try_trigger().await.unwrap();
    let status = wait_until_idle(&failing_scheduler).await;

    assert!(!status.busy);
    let message = status.last_error.expect("failure should be recorded");
    assert!(message.contains("fetch failed"), "got: {}", message);

    // Original store untouched by the failing scheduler's pass
    assert_eq!(store.count(RecordSet::Current).await.unwrap(), 2);
}
