//! # Core Runtime
//!
//! Shared runtime infrastructure for the playlist tracker: logging
//! bootstrap, typed event bus, and application configuration.
//!
//! ## Modules
//!
//! - **Logging** (`logging`): `tracing`-based structured logging with
//!   pretty/compact/JSON output and env-filter support
//! - **Events** (`events`): broadcast event bus carrying reconcile lifecycle
//!   and library change events
//! - **Config** (`config`): application configuration loaded from the
//!   environment with validated defaults

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, LibraryEvent, ReconcileEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
