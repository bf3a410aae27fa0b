//! # Logging & Tracing Infrastructure
//!
//! Configures structured logging with the `tracing` crate:
//! - Pretty, compact, or JSON output
//! - Module-level filtering via `RUST_LOG`-style directives
//! - Sensible defaults per build profile (pretty in debug, JSON in release)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LoggingConfig, LogFormat};
//! use tracing::Level;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(Level::DEBUG);
//!
//! init_logging(config).expect("Failed to initialize logging");
//! tracing::info!("Tracker started");
//! ```

use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format for machine parsing
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level when no filter directives are given
    pub level: Level,
    /// Custom filter string (e.g. "core_reconcile=debug,sqlx=warn");
    /// overrides `level` when set
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter directives
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level, so operators can
/// raise verbosity without a rebuild.
///
/// # Errors
///
/// Returns an error if the filter directives are invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match &config.filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))?,
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(config.level).into())
            .from_env_lossy(),
    };

    let registry = tracing_subscriber::registry().with(filter);

    let init_result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.display_target),
            )
            .try_init(),
    };

    init_result.map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))
}
