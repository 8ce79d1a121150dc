//! `Lander` server entry point.
//!
//! Bootstraps the page store and conversion sinks, then starts the Axum HTTP
//! server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use lander_core::{ConversionTracker, LandingRenderer};
use lander_storage::{ConversionSink, FileConversionSink, MemoryStore, PageStore};

use lander_server::config::{ServerConfig, StorageKind};
use lander_server::routes::build_router;
use lander_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = %storage_label(&config.storage), "Lander starting");

    let state = build_app_state(&config).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, origin = %config.public_origin, "Lander server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Lander server stopped");
    Ok(())
}

/// Build the page store, conversion sinks and renderer.
async fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let (store, sink): (Arc<dyn PageStore>, Arc<dyn ConversionSink>) = match &config.storage {
        StorageKind::Memory { seed_file } => {
            let store = match seed_file {
                Some(path) => lander_storage::load_seed(path)
                    .await
                    .with_context(|| format!("failed to load seed file {path}"))?,
                None => {
                    info!("using empty in-memory store (no LANDER_SEED_FILE)");
                    MemoryStore::new()
                }
            };
            (Arc::new(store.clone()), Arc::new(store))
        }
        #[cfg(feature = "postgres-backend")]
        StorageKind::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL storage");
            let store = lander_storage::PostgresStore::connect(url)
                .await
                .context("failed to connect to PostgreSQL storage")?;
            (Arc::new(store.clone()), Arc::new(store))
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageKind::Postgres { .. } => {
            anyhow::bail!("PostgreSQL storage requested but feature 'postgres-backend' is not enabled");
        }
    };

    let mut tracker = ConversionTracker::new().with_sink(sink);
    if let Some(path) = &config.conversion_log {
        info!(path = %path, "conversion log enabled");
        tracker = tracker.with_sink(Arc::new(FileConversionSink::new(path)));
    }

    let renderer = LandingRenderer::new(store, tracker, config.public_origin.clone());

    Ok(Arc::new(AppState {
        renderer,
        secure_cookies: config.secure_cookies,
    }))
}

fn storage_label(storage: &StorageKind) -> &'static str {
    match storage {
        StorageKind::Memory { .. } => "memory",
        StorageKind::Postgres { .. } => "postgres",
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
