//! SoundCloud API connector implementation
//!
//! Implements the `PlaylistSource` trait for the SoundCloud API v2.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bridge_traits::source::{PlaylistSource, PlaylistTrack};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SoundcloudError};
use crate::types::{ApiPlaylist, ApiTrack};

/// SoundCloud API v2 base URL
const API_BASE: &str = "https://api-v2.soundcloud.com";

/// Public web app, scanned for a client id when none is configured
const WEB_BASE: &str = "https://soundcloud.com";

/// Track ids per hydration request (API caps the ids parameter)
const HYDRATION_BATCH: usize = 50;

/// SoundCloud API connector
///
/// Implements `PlaylistSource` for SoundCloud API v2.
///
/// # Features
///
/// - Playlist resolution via `/resolve`
/// - Hydration of stub track entries via `/tracks`, preserving playlist
///   order
/// - Client id discovery from the web app's script bundles, cached for the
///   connector's lifetime
/// - Exponential backoff on rate limits via the HTTP client's retry policy
///
/// # Example
///
/// ```ignore
/// use provider_soundcloud::SoundcloudConnector;
/// use bridge_traits::source::PlaylistSource;
///
/// let connector = SoundcloudConnector::new(http_client);
/// let tracks = connector.fetch_tracks(playlist_url).await?;
/// ```
pub struct SoundcloudConnector {
    /// HTTP client for API requests
    http: Arc<dyn HttpClient>,

    /// Cached client id; populated from config or discovered on first use
    client_id: Mutex<Option<String>>,
}

impl SoundcloudConnector {
    /// Create a connector that discovers its client id on first use.
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            client_id: Mutex::new(None),
        }
    }

    /// Create a connector with an explicit client id.
    pub fn with_client_id(http: Arc<dyn HttpClient>, client_id: impl Into<String>) -> Self {
        Self {
            http,
            client_id: Mutex::new(Some(client_id.into())),
        }
    }

    /// Resolve the playlist and return its tracks in order.
    #[instrument(skip(self), fields(playlist_url = %playlist_url))]
    pub async fn resolve_playlist(&self, playlist_url: &str) -> Result<Vec<PlaylistTrack>> {
        let client_id = self.ensure_client_id().await?;

        let url = format!(
            "{}/resolve?url={}&client_id={}",
            API_BASE,
            urlencoding::encode(playlist_url),
            client_id
        );
        let playlist: ApiPlaylist = self.get_json(&url).await?;

        match playlist.kind.as_deref() {
            Some("playlist") | None => {}
            Some(kind) => {
                return Err(SoundcloudError::NotAPlaylist {
                    kind: kind.to_string(),
                })
            }
        }

        info!(
            playlist_id = playlist.id,
            declared = playlist.track_count.unwrap_or(0),
            embedded = playlist.tracks.len(),
            "Resolved playlist"
        );

        let tracks = self.hydrate_tracks(playlist.tracks, &client_id).await?;
        let album = playlist.title;

        let mut result = Vec::with_capacity(tracks.len());
        for (position, track) in tracks.into_iter().enumerate() {
            let Some(permalink_url) = track.permalink_url else {
                // Deleted or private tracks stay stubs after hydration;
                // without a permalink there is no stable identifier.
                warn!(track_id = track.id, "Skipping track without permalink");
                continue;
            };

            result.push(PlaylistTrack {
                title: track.title.unwrap_or_else(|| "Untitled".to_string()),
                artist: track.user.and_then(|u| u.username),
                duration_ms: track.duration,
                permalink_url,
                track_number: Some(position as u64 + 1),
                album: album.clone(),
            });
        }

        Ok(result)
    }

    /// Replace stub entries with full track resources, keeping order.
    ///
    /// Stubs that the `/tracks` endpoint does not return (deleted or
    /// geo-blocked tracks) are passed through and filtered by the caller.
    async fn hydrate_tracks(
        &self,
        tracks: Vec<ApiTrack>,
        client_id: &str,
    ) -> Result<Vec<ApiTrack>> {
        let stub_ids: Vec<u64> = tracks
            .iter()
            .filter(|t| t.is_stub())
            .map(|t| t.id)
            .collect();
        if stub_ids.is_empty() {
            return Ok(tracks);
        }

        debug!(stubs = stub_ids.len(), "Hydrating stub tracks");

        let mut hydrated: HashMap<u64, ApiTrack> = HashMap::with_capacity(stub_ids.len());
        for chunk in stub_ids.chunks(HYDRATION_BATCH) {
            let ids = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let url = format!("{}/tracks?ids={}&client_id={}", API_BASE, ids, client_id);
            let batch: Vec<ApiTrack> = self.get_json(&url).await?;
            hydrated.extend(batch.into_iter().map(|t| (t.id, t)));
        }

        Ok(tracks
            .into_iter()
            .map(|t| match hydrated.remove(&t.id) {
                Some(full) if t.is_stub() => full,
                _ => t,
            })
            .collect())
    }

    /// Return the configured client id, discovering one on first use.
    async fn ensure_client_id(&self) -> Result<String> {
        let mut guard = self.client_id.lock().await;
        if let Some(id) = guard.as_ref() {
            return Ok(id.clone());
        }

        let id = self.discover_client_id().await?;
        info!("Discovered SoundCloud client id");
        *guard = Some(id.clone());
        Ok(id)
    }

    /// Scan the web app for a usable client id.
    ///
    /// The id lives in one of the cross-origin script bundles; the last
    /// bundle referenced by the page usually carries it, so they are
    /// scanned in reverse order.
    async fn discover_client_id(&self) -> Result<String> {
        let page = self.get_text(WEB_BASE).await?;

        for script_url in script_urls(&page).iter().rev() {
            let body = match self.get_text(script_url).await {
                Ok(body) => body,
                Err(e) => {
                    debug!(url = %script_url, error = %e, "Skipping unreadable script");
                    continue;
                }
            };
            if let Some(id) = extract_client_id(&body) {
                return Ok(id);
            }
        }

        Err(SoundcloudError::ClientIdDiscovery)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .execute_with_retry(HttpRequest::get(url), RetryPolicy::default())
            .await?;

        match response.status {
            200 => response
                .json()
                .map_err(|e| SoundcloudError::ParseError(e.to_string())),
            401 | 403 => Err(SoundcloudError::AuthenticationFailed {
                status_code: response.status,
            }),
            status => Err(SoundcloudError::ApiError {
                status_code: status,
                message: response.text().unwrap_or_default().chars().take(200).collect(),
            }),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .execute_with_retry(HttpRequest::get(url), RetryPolicy::default())
            .await?;

        if !response.is_success() {
            return Err(SoundcloudError::ApiError {
                status_code: response.status,
                message: format!("GET {} failed", url),
            });
        }

        Ok(response.text()?)
    }
}

#[async_trait]
impl PlaylistSource for SoundcloudConnector {
    async fn fetch_tracks(
        &self,
        playlist_url: &str,
    ) -> bridge_traits::error::Result<Vec<PlaylistTrack>> {
        self.resolve_playlist(playlist_url)
            .await
            .map_err(Into::into)
    }
}

/// Collect cross-origin script URLs referenced by the web app page.
fn script_urls(html: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for part in html.split("src=\"").skip(1) {
        let Some(end) = part.find('"') else { continue };
        let url = &part[..end];
        if url.ends_with(".js") && url.contains("sndcdn.com") {
            urls.push(url.to_string());
        }
    }
    urls
}

/// Pull a `client_id:"..."` literal out of a script bundle.
fn extract_client_id(script: &str) -> Option<String> {
    let start = script.find("client_id:\"")? + "client_id:\"".len();
    let rest = &script[start..];
    let end = rest.find('"')?;
    let id = &rest[..end];

    // Ids are long alphanumeric tokens; anything else is a false positive.
    if id.len() >= 16 && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id.to_string())
    } else {
        None
    }
}
