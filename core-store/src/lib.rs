//! # Record Store Module
//!
//! Owns the tracker database and provides the record-set store and query
//! APIs.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema and migrations for the three record sets
//!   (`current_tracks`, `all_tracks`, `removed_tracks`)
//! - The [`RecordStore`](store::RecordStore) contract the reconciliation
//!   engine mutates through
//! - Read-side queries with pagination and text search
//!   ([`RecordQuery`](query::RecordQuery))

pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod store;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use models::{RecordSet, TrackRecord, TrackStatus};
pub use query::{CollectionStats, Page, PageRequest, RecordQuery};
pub use store::{RecordStore, SqliteRecordStore};
