// ABOUTME: HTTP server startup and graceful shutdown
// ABOUTME: Connects storage once, builds application state, and runs the optional health poller

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use backstage_api::{create_router, AppState};
use backstage_monitoring::HealthPoller;
use backstage_pricing::Catalog;
use backstage_storage::Database;

use crate::config::Config;

/// Load the configured catalog file, or the built-in one
pub fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    match &config.catalog_path {
        Some(path) => {
            let catalog = Catalog::load(path)
                .with_context(|| format!("Failed to load pricing catalog {}", path.display()))?;
            info!(path = %path.display(), "Loaded pricing catalog");
            Ok(catalog)
        }
        None => Catalog::builtin().context("Built-in pricing catalog is invalid"),
    }
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any))
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.storage_config())
        .await
        .context("Failed to open database")?;
    let catalog = Arc::new(load_catalog(&config)?);

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    if config.service_key.is_none() {
        warn!("BACKSTAGE_SERVICE_KEY is not set; project credential updates are accepted without a service key");
    }

    let state = AppState::new(&db, catalog, config.api_settings());

    let mut poller = config.health_poll_interval.map(|interval| {
        HealthPoller::new(state.health.clone(), state.projects.clone(), interval)
    });
    if let Some(poller) = poller.as_mut() {
        poller.start()?;
    }

    let app = create_router(state)
        .layer(cors_layer(&config.cors_origin)?)
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Backstage listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(mut poller) = poller {
        if let Err(e) = poller.stop().await {
            warn!("{}", e);
        }
    }
    db.pool.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
