//! Sightings service — binary entrypoint.
//! Boots the Axum HTTP server and closes every live feed on shutdown.

use anyhow::Context;
use sightings_feed::{api, feed::FeedBroadcaster, AppConfig, AppState, Story};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    sightings_feed::init_tracing();

    let cfg = AppConfig::from_env();
    let state = AppState::from_config(&cfg)
        .await
        .context("Failed to build application state")?;
    let feed = state.feed.clone();
    let app = api::create_router(state, &cfg)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .context("Failed to bind to address")?;
    info!("Server listening on: http://localhost:{}", cfg.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(feed))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C / SIGTERM after closing all feed subscriptions, so the
/// open event streams end and graceful shutdown can drain connections.
async fn shutdown_signal(feed: FeedBroadcaster<Story>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = ?e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = ?e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }

    let closed = feed.shutdown();
    info!(closed, "live feed subscriptions closed");
}
