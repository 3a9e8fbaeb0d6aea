mod api;
mod config;
mod lookup;
mod storage;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::lookup::BookLookup;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("🚀 Starting Book Lookup API Server");

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Variant: {}", config.handler.variant);
    info!("   - Backend: {:?}", config.store.backend);
    info!("   - Table: {}", config.store.table_name);
    info!("   - Server: {}:{}", config.server.host, config.server.port);

    // Open record store
    info!("💾 Opening record store...");
    let store = storage::open(&config.store).await?;
    info!("✅ Record store ready ({})", store.backend());

    let state = AppState {
        lookup: Arc::new(BookLookup::new(store, config.handler.variant)),
    };

    let app = api::app(state);

    // Start server
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   GET  /health           - Health check");
    info!("   GET  /books?bookid=N   - Get a book (or list all)");
    info!("   POST /invoke           - Handle a proxy event");
    info!("");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
