mod api;
mod config;
mod storage;
mod vote;

use crate::api::AppState;
use crate::config::{AppConfig, StoreBackend};
use crate::storage::{InMemoryMovieStore, MongoMovieStore, MovieRepository};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("🎬 Starting Movie Voting API v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    info!("📋 Configuration loaded");
    info!("   - Store Backend: {}", config.storage.backend);
    info!("   - Server: {}:{}", config.server.host, config.server.port);

    // Connect to the movie store; refuse to serve if it is unreachable
    let movies: Arc<dyn MovieRepository> = match config.storage.backend {
        StoreBackend::Mongo => {
            info!("💾 Connecting to MongoDB...");
            info!("   - Connection: {}", config.mongo.redacted_conn_str());
            info!("   - Username: {}", config.mongo.username);
            info!(
                "   - Namespace: {}.{}",
                config.mongo.database, config.mongo.collection
            );
            let store = MongoMovieStore::connect(&config.mongo)
                .await
                .context("Couldn't connect to the database")?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("⚠️  Using in-memory store, data is lost on exit");
            Arc::new(InMemoryMovieStore::new())
        }
    };
    info!("✅ Movie store ready");

    let state = AppState::new(movies.clone());
    let app = api::router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   GET    /ok                    - Liveness check");
    info!("   GET    /version               - API version");
    info!("   GET    /cpu                   - Host CPU details");
    info!("   GET    /movies                - List movies");
    info!("   POST   /movies/{{title}}        - Add movie");
    info!("   GET    /movies/{{title}}        - Get movie");
    info!("   DELETE /movies/{{title}}        - Delete movie");
    info!("   GET    /movies/{{title}}/vote   - Vote for movie");
    info!("");
    info!("✨ Server is ready to accept requests!");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    movies.shutdown().await;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
