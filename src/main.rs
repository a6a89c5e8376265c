mod api;
mod config;
mod data;
mod error;
mod export;
mod pipeline;
mod storage;

use anyhow::Context;
use api::{AppState, SessionStore};
use config::{AppConfig, ExportTarget};
use data::BnrFeed;
use dotenv::dotenv;
use export::{DriveSink, ExportSink, LocalDirSink};
use pipeline::{spawn_scheduler, IngestionPipeline, PipelineSettings};
use std::sync::Arc;
use storage::{Database, SqliteCurrencyConfigStore, SqliteObservationStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Picks the export sink named by the configuration.
fn build_sink(target: &ExportTarget) -> Arc<dyn ExportSink> {
    match target {
        ExportTarget::Drive {
            access_token,
            folder_id,
        } => Arc::new(DriveSink::new(access_token.clone(), folder_id.clone())),
        ExportTarget::LocalDir(dir) => Arc::new(LocalDirSink::new(dir.clone())),
    }
}

/// Service entry point.
///
/// 1. Initialize logging and load `.env`
/// 2. Open the SQLite database and the stores on top of it
/// 3. Assemble the ingestion pipeline and start the scheduler
/// 4. Serve the HTTP API until the server stops or Ctrl-C arrives
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    // Load environment variables from .env file
    dotenv().ok();
    let config = AppConfig::from_env().context("invalid configuration")?;

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    info!(path = %config.database_path.display(), "connected to the SQLite database");

    let currencies = Arc::new(SqliteCurrencyConfigStore::new(db.clone()));
    let observations = Arc::new(SqliteObservationStore::new(db));

    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::new(BnrFeed::new(config.feed_url.clone())),
        currencies.clone(),
        observations.clone(),
        build_sink(&config.export_target),
        PipelineSettings {
            fetch_timeout: config.fetch_timeout,
            upload_timeout: config.upload_timeout,
            export_name: config.export_name.clone(),
            scratch_path: config.scratch_path.clone(),
        },
    ));

    let scheduler = spawn_scheduler(Arc::clone(&pipeline), config.schedule_interval);

    let state = AppState {
        pipeline,
        currencies,
        observations,
        sessions: Arc::new(SessionStore::new(
            config.admin_username.clone(),
            &config.admin_password,
            config.session_ttl,
        )),
    };

    let result = tokio::select! {
        served = api::run_server(state, &config.bind_addr) => {
            served.with_context(|| format!("api server on {} failed", config.bind_addr))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    };

    scheduler.abort();
    result
}
