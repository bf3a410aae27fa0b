//! # Host Bridge Traits
//!
//! Abstraction seams between the tracker core and the outside world.
//!
//! ## Overview
//!
//! This crate defines the contracts the core consumes but does not implement
//! itself. Each trait represents a capability with at least two useful
//! implementations: a production one wired up by the server binary and a
//! mock used in tests.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and TLS
//! - [`PlaylistSource`](source::PlaylistSource) - Fetch the current track
//!   listing of a remote playlist
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert their underlying errors to `BridgeError`
//! with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod error;
pub mod http;
pub mod source;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use source::{PlaylistSource, PlaylistTrack};
