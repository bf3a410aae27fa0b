//! # SoundCloud Provider
//!
//! Implements the `PlaylistSource` trait against the SoundCloud API v2.
//!
//! ## Overview
//!
//! This module provides:
//! - Playlist resolution via the `/resolve` endpoint
//! - Hydration of stub track entries via `/tracks` (playlists only embed
//!   full data for their first few tracks)
//! - Client id discovery by scanning the public web app's script bundles
//! - Retry with exponential backoff on rate limits and server errors

pub mod connector;
pub mod error;
pub mod types;

pub use connector::SoundcloudConnector;
pub use error::{Result, SoundcloudError};
