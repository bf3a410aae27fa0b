//! Playlist tracker service entrypoint
//!
//! Wires the record store, reconcile engine, scheduler, SoundCloud
//! connector, and HTTP API together, then serves until terminated.

mod error;
mod hooks;
mod http;
mod routes;
mod state;

use anyhow::Context;
use core_reconcile::{ReconcileEngine, UpdateScheduler};
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::AppConfig;
use core_store::{create_pool, DatabaseConfig, RecordQuery, RecordStore, SqliteRecordStore};
use http::ReqwestHttpClient;
use provider_soundcloud::SoundcloudConnector;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default())?;

    let config = AppConfig::from_env().context("loading configuration")?;
    info!(
        playlist = %config.playlist_url,
        database = %config.database_path.display(),
        interval_secs = config.update_interval_secs,
        "Starting playlist tracker"
    );

    let pool = create_pool(DatabaseConfig::new(&config.database_path))
        .await
        .context("opening database")?;

    let event_bus = EventBus::default();
    let store = Arc::new(SqliteRecordStore::new(pool.clone()));
    let engine = ReconcileEngine::new(store as Arc<dyn RecordStore>, event_bus.clone());

    let http_client = Arc::new(ReqwestHttpClient::new());
    let connector = match &config.soundcloud_client_id {
        Some(client_id) => SoundcloudConnector::with_client_id(http_client, client_id.clone()),
        None => SoundcloudConnector::new(http_client),
    };

    let scheduler = Arc::new(UpdateScheduler::new(
        engine,
        Arc::new(connector),
        event_bus.clone(),
        config.playlist_url.clone(),
        Duration::from_secs(config.update_interval_secs),
    ));

    hooks::spawn_track_change_logger(&event_bus);
    tokio::spawn(Arc::clone(&scheduler).run_loop());

    let app = routes::router(AppState {
        query: Arc::new(RecordQuery::new(pool)),
        scheduler,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "HTTP API listening");

    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}
