// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod feed;
pub mod metrics;
pub mod sightings;
pub mod timestamp;

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// A news item carried by the live feed.
pub type Story = String;

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` (default `info`); `LOG_FORMAT=json` switches
/// to JSON lines. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// Build the in-process app from the environment, as the binary does.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::from_env();
    let state = AppState::from_config(&cfg).await?;
    api::create_router(state, &cfg)
}
