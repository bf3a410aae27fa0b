use core_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// An empty snapshot is never applied: a transient fetch failure must
    /// not look like every track being removed at once.
    #[error("Fetched snapshot was empty; keeping last known state")]
    EmptySnapshot,

    #[error("Snapshot fetch failed: {0}")]
    Fetch(String),

    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),

    #[error("An update is already in progress")]
    Busy,
}

impl ReconcileError {
    /// True when the next scheduled pass is expected to succeed without
    /// operator intervention.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReconcileError::EmptySnapshot | ReconcileError::Fetch(_) | ReconcileError::Busy
        )
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
