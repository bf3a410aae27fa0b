//! # Reconciliation Module
//!
//! Diffs playlist snapshots against persisted state and applies the result.
//!
//! ## Overview
//!
//! This module manages:
//! - Computing set differences between a fresh snapshot and the historical
//!   ledger
//! - Applying status transitions and timestamps across the three record sets
//!   (`current`, `all`, `removed`) in an order that keeps the removed mirror
//!   correct for concurrent readers
//! - Scheduling passes on a fixed interval with manual triggering, enforcing
//!   at most one pass in flight
//!
//! ## Components
//!
//! - **Reconcile Engine** (`engine`): the diff-and-apply algorithm and its
//!   summary report
//! - **Update Scheduler** (`scheduler`): interval/manual triggering, busy
//!   guard, and last-result tracking for status polling

pub mod engine;
pub mod error;
pub mod scheduler;

pub use engine::{ReconcileEngine, ReconcileSummary};
pub use error::{ReconcileError, Result};
pub use scheduler::{UpdateScheduler, UpdateStatus};
