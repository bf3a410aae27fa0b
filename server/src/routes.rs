//! HTTP API routes
//!
//! Read endpoints serve paginated, searchable views of the record sets;
//! write access is limited to triggering a reconciliation pass.

use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use core_reconcile::{ReconcileSummary, UpdateStatus};
use core_store::query::DEFAULT_PAGE_SIZE;
use core_store::{CollectionStats, Page, PageRequest, RecordSet, TrackRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Create the API router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tracks/:set", get(list_tracks))
        .route("/api/update", post(trigger_update))
        .route("/api/update-status", get(update_status))
        .route("/api/stats", get(stats))
        .with_state(state)
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for listing tracks.
#[derive(Debug, Deserialize)]
pub struct ListTracksQuery {
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 50, max: 100).
    pub page_size: Option<u32>,
    /// Case-insensitive substring match on title or artist.
    pub search: Option<String>,
}

/// One track as rendered by the API, timestamps in `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_seconds: f64,
    pub permalink_url: String,
    pub last_updated: String,
    pub playlist_source: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl From<TrackRecord> for TrackResponse {
    fn from(record: TrackRecord) -> Self {
        Self {
            last_updated: TrackRecord::format_timestamp(record.last_updated),
            removed_at: record.removed_at.map(TrackRecord::format_timestamp),
            id: record.id,
            title: record.title,
            artist: record.artist,
            duration_seconds: record.duration_seconds,
            permalink_url: record.permalink_url,
            playlist_source: record.playlist_source,
            status: record.status.as_str().to_string(),
            track_number: record.track_number,
            album: record.album,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct TrackPageResponse {
    /// Records in the current page, newest first.
    pub records: Vec<TrackResponse>,
    /// Total number of records across all pages.
    pub total: u64,
    /// Current page number (1-indexed).
    pub page: u32,
    /// Number of records per page.
    pub page_size: u32,
    /// Total number of pages; 0 when nothing matched.
    pub total_pages: u32,
}

impl From<Page<TrackRecord>> for TrackPageResponse {
    fn from(page: Page<TrackRecord>) -> Self {
        Self {
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
            records: page.items.into_iter().map(TrackResponse::from).collect(),
        }
    }
}

/// Scheduler status as rendered by the API.
#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<ReconcileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<String>,
}

impl From<UpdateStatus> for UpdateStatusResponse {
    fn from(status: UpdateStatus) -> Self {
        Self {
            busy: status.busy,
            last_result: status.last_result,
            last_error: status.last_error,
            last_run_at: status.last_run_at.map(TrackRecord::format_timestamp),
            next_run_at: status.next_run_at.map(TrackRecord::format_timestamp),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/tracks/:set
///
/// Lists one record set with pagination and optional search.
async fn list_tracks(
    State(state): State<AppState>,
    Path(set): Path<String>,
    Query(query): Query<ListTracksQuery>,
) -> Result<Json<TrackPageResponse>> {
    let set: RecordSet = set.parse().map_err(ApiError::from)?;
    let request = PageRequest::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );

    let page = state
        .query
        .query(set, request, query.search.as_deref())
        .await?;

    Ok(Json(page.into()))
}

/// POST /api/update
///
/// Triggers a reconciliation pass in the background. Rejected with 429
/// while a pass is in flight.
async fn trigger_update(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    state.scheduler.try_trigger().await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Update started in background" })),
    ))
}

/// GET /api/update-status
async fn update_status(State(state): State<AppState>) -> Json<UpdateStatusResponse> {
    Json(state.scheduler.status().await.into())
}

/// GET /api/stats
async fn stats(State(state): State<AppState>) -> Result<Json<CollectionStats>> {
    Ok(Json(state.query.stats().await?))
}
