//! # Update Scheduler
//!
//! Triggers reconciliation passes on a fixed interval or on demand,
//! enforcing at most one pass in flight.
//!
//! ## Concurrency model
//!
//! The busy flag lives in a mutex-guarded state object owned by the
//! scheduler, checked-and-set before a pass task is spawned and cleared
//! when the task finishes, success or failure. A trigger that finds the
//! flag set is rejected with `Busy`, never queued or merged. There is no
//! cancellation: an in-flight pass always runs to completion before the
//! flag clears.
//!
//! A pass runs on its own tokio task, so neither the interval loop nor API
//! handlers block on it; read queries proceed concurrently against the
//! store throughout.

use crate::engine::{ReconcileEngine, ReconcileSummary};
use crate::error::{ReconcileError, Result};
use bridge_traits::source::PlaylistSource;
use core_runtime::events::{CoreEvent, EventBus, ReconcileEvent};
use core_store::TrackRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Scheduler-owned pass state: the busy guard plus status-poll bookkeeping.
#[derive(Debug, Default)]
struct SchedulerState {
    in_progress: bool,
    last_result: Option<ReconcileSummary>,
    last_error: Option<String>,
    last_run_at: Option<i64>,
    next_run_at: Option<i64>,
}

/// Snapshot of scheduler state for status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// Whether a pass is currently in flight
    pub busy: bool,
    /// Summary of the most recent successful pass
    pub last_result: Option<ReconcileSummary>,
    /// Error message of the most recent failed pass; cleared on success
    pub last_error: Option<String>,
    /// Unix seconds when the last pass finished
    pub last_run_at: Option<i64>,
    /// Unix seconds of the next scheduled pass
    pub next_run_at: Option<i64>,
}

/// Drives the [`ReconcileEngine`] periodically and on demand.
pub struct UpdateScheduler {
    engine: ReconcileEngine,
    source: Arc<dyn PlaylistSource>,
    event_bus: EventBus,
    playlist_url: String,
    interval: Duration,
    state: Arc<Mutex<SchedulerState>>,
}

impl UpdateScheduler {
    /// Create a new scheduler.
    ///
    /// # Arguments
    ///
    /// * `engine` - the reconcile engine to drive
    /// * `source` - playlist source the snapshots come from
    /// * `event_bus` - bus for pass lifecycle events
    /// * `playlist_url` - the playlist being tracked
    /// * `interval` - time between scheduled passes
    pub fn new(
        engine: ReconcileEngine,
        source: Arc<dyn PlaylistSource>,
        event_bus: EventBus,
        playlist_url: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            source,
            event_bus,
            playlist_url: playlist_url.into(),
            interval,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// Clone for the background pass task (avoids `Arc<Arc<...>>`).
    fn clone_for_task(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            source: Arc::clone(&self.source),
            event_bus: self.event_bus.clone(),
            playlist_url: self.playlist_url.clone(),
            interval: self.interval,
            state: Arc::clone(&self.state),
        }
    }

    /// Start a pass in the background unless one is already in flight.
    ///
    /// Returns as soon as the pass task is spawned; poll [`status`](Self::status)
    /// for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Busy`] while a pass is in flight. The
    /// request is rejected, never queued.
    pub async fn try_trigger(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.in_progress {
                return Err(ReconcileError::Busy);
            }
            state.in_progress = true;
        }

        let scheduler = self.clone_for_task();
        tokio::spawn(async move {
            let pass_id = Uuid::new_v4().to_string();
            let result = scheduler.run_pass(&pass_id).await;

            let mut state = scheduler.state.lock().await;
            state.in_progress = false;
            state.last_run_at = Some(chrono::Utc::now().timestamp());
            match result {
                Ok(summary) => {
                    state.last_result = Some(summary);
                    state.last_error = None;
                }
                Err(e) => {
                    state.last_error = Some(e.to_string());
                }
            }
        });

        Ok(())
    }

    /// Run scheduled passes until the task is aborted.
    ///
    /// The first pass starts immediately; subsequent passes fire on the
    /// configured interval. A tick that finds a pass still in flight is
    /// skipped, not queued.
    pub async fn run_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            playlist = %self.playlist_url,
            "Update scheduler started"
        );

        loop {
            ticker.tick().await;

            {
                let mut state = self.state.lock().await;
                state.next_run_at =
                    Some(chrono::Utc::now().timestamp() + self.interval.as_secs() as i64);
            }

            match self.try_trigger().await {
                Ok(()) => {}
                Err(ReconcileError::Busy) => {
                    warn!("Previous pass still running, skipping scheduled tick");
                }
                Err(e) => {
                    error!(error = %e, "Failed to start scheduled pass");
                }
            }
        }
    }

    /// Current scheduler state for the status endpoint.
    pub async fn status(&self) -> UpdateStatus {
        let state = self.state.lock().await;
        UpdateStatus {
            busy: state.in_progress,
            last_result: state.last_result.clone(),
            last_error: state.last_error.clone(),
            last_run_at: state.last_run_at,
            next_run_at: state.next_run_at,
        }
    }

    /// Fetch a snapshot and run the engine over it.
    ///
    /// Fetch failures are non-destructive by construction: the engine is
    /// never invoked without a snapshot, so the store keeps its last known
    /// good state.
    #[instrument(skip(self), fields(pass_id = %pass_id, playlist = %self.playlist_url))]
    async fn run_pass(&self, pass_id: &str) -> Result<ReconcileSummary> {
        self.event_bus
            .emit(CoreEvent::Reconcile(ReconcileEvent::Started {
                pass_id: pass_id.to_string(),
                playlist_url: self.playlist_url.clone(),
            }))
            .ok();

        let result = self.fetch_and_reconcile().await;

        match &result {
            Ok(summary) => {
                self.event_bus
                    .emit(CoreEvent::Reconcile(ReconcileEvent::Completed {
                        pass_id: pass_id.to_string(),
                        current_count: summary.current_count.max(0) as u64,
                        all_count: summary.all_count.max(0) as u64,
                        removed_count: summary.removed_count.max(0) as u64,
                        new_tracks: summary.new_tracks,
                        removed_tracks: summary.removed_tracks,
                    }))
                    .ok();
            }
            Err(e) => {
                error!(error = %e, "Reconciliation pass failed");
                self.event_bus
                    .emit(CoreEvent::Reconcile(ReconcileEvent::Failed {
                        pass_id: pass_id.to_string(),
                        message: e.to_string(),
                        recoverable: e.is_recoverable(),
                    }))
                    .ok();
            }
        }

        result
    }

    async fn fetch_and_reconcile(&self) -> Result<ReconcileSummary> {
        let tracks = self
            .source
            .fetch_tracks(&self.playlist_url)
            .await
            .map_err(|e| ReconcileError::Fetch(e.to_string()))?;

        // One timestamp for the whole pass; every mutation below stamps it.
        let pass_ts = chrono::Utc::now().timestamp();

        let snapshot: Vec<TrackRecord> = tracks
            .iter()
            .map(|t| TrackRecord::from_playlist_track(t, &self.playlist_url, pass_ts))
            .collect();

        self.engine.reconcile(&snapshot, pass_ts).await
    }
}
