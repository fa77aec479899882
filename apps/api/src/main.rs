mod analysis;
mod analysis_client;
mod analyzer;
mod config;
mod errors;
mod history;
mod navigator;
mod routes;
mod state;
mod store;
mod view;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis_client::HttpAnalysisClient;
use crate::config::{Config, StoreBackend};
use crate::navigator::session::SessionRegistry;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::memory::MemoryRecordStore;
use crate::store::postgres::PgRecordStore;
use crate::store::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Lens v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;

    let analysis = HttpAnalysisClient::new(
        &config.analysis_api_url,
        Duration::from_secs(config.analysis_timeout_secs),
    )
    .context("Failed to build scoring API client")?;
    info!("Scoring API client initialized ({})", config.analysis_api_url);

    let state = AppState {
        config: config.clone(),
        analysis: Arc::new(analysis),
        store,
        sessions: SessionRegistry::new(Duration::from_secs(config.session_idle_secs)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the frontend origin once it has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the history store selected by RECORD_STORE.
async fn build_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match config.record_store {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres record store")?;

            info!("Connecting to PostgreSQL...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await?;
            info!("PostgreSQL connection pool established");

            Ok(Arc::new(PgRecordStore::new(pool)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory record store; history is lost on restart");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
    }
}
