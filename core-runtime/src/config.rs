//! # Application Configuration
//!
//! Configuration for the tracker service, built either programmatically or
//! from environment variables.
//!
//! ## Environment variables
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `TRACKER_PLAYLIST_URL` | yes | none |
//! | `TRACKER_DATABASE_PATH` | no | `tracker.db` |
//! | `TRACKER_BIND_ADDR` | no | `0.0.0.0:5000` |
//! | `TRACKER_UPDATE_INTERVAL_SECS` | no | `300` |
//! | `TRACKER_SOUNDCLOUD_CLIENT_ID` | no | discovered at runtime |
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::AppConfig;
//!
//! let config = AppConfig::builder()
//!     .playlist_url("https://soundcloud.com/user/sets/playlist")
//!     .database_path("/var/lib/tracker/tracker.db")
//!     .update_interval_secs(600)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.update_interval_secs, 600);
//! ```

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default reconciliation interval in seconds.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default SQLite database path.
pub const DEFAULT_DATABASE_PATH: &str = "tracker.db";

/// Application configuration for the tracker service.
///
/// Use [`AppConfig::builder`] or [`AppConfig::from_env`] to construct
/// instances; both validate before returning.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// URL of the playlist being tracked
    pub playlist_url: String,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Address the HTTP API listens on
    pub bind_addr: SocketAddr,

    /// Seconds between scheduled reconciliation passes
    pub update_interval_secs: u64,

    /// SoundCloud API client id; when absent the connector discovers one
    pub soundcloud_client_id: Option<String>,
}

impl AppConfig {
    /// Start building a configuration.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from `TRACKER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TRACKER_PLAYLIST_URL` is missing or any value
    /// fails validation.
    pub fn from_env() -> Result<Self> {
        let mut builder = AppConfigBuilder::default();

        if let Ok(url) = std::env::var("TRACKER_PLAYLIST_URL") {
            builder = builder.playlist_url(url);
        }
        if let Ok(path) = std::env::var("TRACKER_DATABASE_PATH") {
            builder = builder.database_path(path);
        }
        if let Ok(addr) = std::env::var("TRACKER_BIND_ADDR") {
            builder = builder.bind_addr(addr);
        }
        if let Ok(interval) = std::env::var("TRACKER_UPDATE_INTERVAL_SECS") {
            let secs = interval.parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "TRACKER_UPDATE_INTERVAL_SECS must be an integer, got '{}'",
                    interval
                ))
            })?;
            builder = builder.update_interval_secs(secs);
        }
        if let Ok(client_id) = std::env::var("TRACKER_SOUNDCLOUD_CLIENT_ID") {
            builder = builder.soundcloud_client_id(client_id);
        }

        builder.build()
    }
}

/// Builder for [`AppConfig`] with fail-fast validation.
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    playlist_url: Option<String>,
    database_path: Option<PathBuf>,
    bind_addr: Option<String>,
    update_interval_secs: Option<u64>,
    soundcloud_client_id: Option<String>,
}

impl AppConfigBuilder {
    /// Set the playlist URL (required).
    pub fn playlist_url(mut self, url: impl Into<String>) -> Self {
        self.playlist_url = Some(url.into());
        self
    }

    /// Set the SQLite database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the HTTP bind address (`host:port`).
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// Set the reconciliation interval in seconds.
    pub fn update_interval_secs(mut self, secs: u64) -> Self {
        self.update_interval_secs = Some(secs);
        self
    }

    /// Set an explicit SoundCloud client id.
    pub fn soundcloud_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.soundcloud_client_id = Some(client_id.into());
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the playlist URL is missing or not an http(s) URL
    /// - the bind address does not parse as `host:port`
    /// - the update interval is zero
    pub fn build(self) -> Result<AppConfig> {
        let playlist_url = self
            .playlist_url
            .ok_or_else(|| Error::Config("playlist URL is required".to_string()))?;

        if !playlist_url.starts_with("http://") && !playlist_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "playlist URL must be an http(s) URL, got '{}'",
                playlist_url
            )));
        }

        let bind_addr_raw = self
            .bind_addr
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr_raw.parse().map_err(|_| {
            Error::Config(format!("invalid bind address '{}'", bind_addr_raw))
        })?;

        let update_interval_secs = self
            .update_interval_secs
            .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS);
        if update_interval_secs == 0 {
            return Err(Error::Config(
                "update interval must be at least one second".to_string(),
            ));
        }

        Ok(AppConfig {
            playlist_url,
            database_path: self
                .database_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            bind_addr,
            update_interval_secs,
            soundcloud_client_id: self.soundcloud_client_id,
        })
    }
}
