// src/config/mod.rs
//! Process configuration, read from the environment (after `.env`).

pub mod stories;

use std::path::PathBuf;
use std::time::Duration;

use crate::feed::broadcaster::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_INTERVAL_MS};
use crate::feed::FeedConfig;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:sightings.db?mode=rwc";
pub const MIN_INTERVAL_MS: u64 = 10;

pub const ENV_PORT: &str = "PORT";
pub const ENV_FEED_INTERVAL_MS: &str = "FEED_INTERVAL_MS";
pub const ENV_FEED_CHANNEL_CAPACITY: &str = "FEED_CHANNEL_CAPACITY";
pub const ENV_PUBLIC_DIR: &str = "PUBLIC_DIR";
pub const ENV_METRICS_ROUTES: &str = "METRICS_ROUTES";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub feed: FeedConfig,
    pub public_dir: PathBuf,
    /// sqlx SQLite URL of the sightings store.
    pub database_url: String,
    /// Mount `/metrics` (METRICS_ROUTES=1).
    pub metrics_routes: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            feed: FeedConfig::default(),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            metrics_routes: false,
        }
    }
}

// parse optional integer env; unparsable values fall back to the default
fn parse_env<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();

        let interval_ms = parse_env::<u64>(var(ENV_FEED_INTERVAL_MS))
            .unwrap_or(DEFAULT_INTERVAL_MS)
            .max(MIN_INTERVAL_MS);
        let capacity = parse_env::<usize>(var(ENV_FEED_CHANNEL_CAPACITY))
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
            .max(1);

        Self {
            port: parse_env(var(ENV_PORT)).unwrap_or(DEFAULT_PORT),
            feed: FeedConfig {
                interval: Duration::from_millis(interval_ms),
                channel_capacity: capacity,
            },
            public_dir: var(ENV_PUBLIC_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR)),
            database_url: var(ENV_DATABASE_URL)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            metrics_routes: var(ENV_METRICS_ROUTES).as_deref() == Some("1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const ALL: [&str; 6] = [
        ENV_PORT,
        ENV_DATABASE_URL,
        ENV_FEED_INTERVAL_MS,
        ENV_FEED_CHANNEL_CAPACITY,
        ENV_PUBLIC_DIR,
        ENV_METRICS_ROUTES,
    ];

    #[serial_test::serial]
    #[test]
    fn defaults_when_env_is_empty() {
        for k in ALL {
            env::remove_var(k);
        }
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.feed.interval, Duration::from_millis(4_000));
        assert_eq!(cfg.feed.channel_capacity, 16);
        assert_eq!(cfg.public_dir, PathBuf::from("public"));
        assert_eq!(cfg.database_url, "sqlite:sightings.db?mode=rwc");
        assert!(!cfg.metrics_routes);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_are_parsed_and_clamped() {
        env::set_var(ENV_PORT, "9001");
        env::set_var(ENV_FEED_INTERVAL_MS, "1");
        env::set_var(ENV_FEED_CHANNEL_CAPACITY, "0");
        env::set_var(ENV_PUBLIC_DIR, "static");
        env::set_var(ENV_METRICS_ROUTES, "1");
        env::set_var(ENV_DATABASE_URL, " sqlite::memory: ");

        let cfg = AppConfig::from_env();
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.feed.interval, Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(cfg.feed.channel_capacity, 1);
        assert_eq!(cfg.public_dir, PathBuf::from("static"));
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert!(cfg.metrics_routes);

        env::set_var(ENV_FEED_INTERVAL_MS, "soon");
        assert_eq!(
            AppConfig::from_env().feed.interval,
            Duration::from_millis(4_000)
        );

        for k in ALL {
            env::remove_var(k);
        }
    }
}
