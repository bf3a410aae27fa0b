//! Shared application state for API handlers

use core_reconcile::UpdateScheduler;
use core_store::RecordQuery;
use std::sync::Arc;

/// State threaded through every axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Read-side access to the record sets
    pub query: Arc<RecordQuery>,
    /// Scheduler for triggering passes and polling status
    pub scheduler: Arc<UpdateScheduler>,
}
