use anyhow::Result;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::feed::FeedConfig;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

fn describe_series() {
    describe_counter!(
        "feed_subscriptions_opened_total",
        "Live feed subscriptions opened."
    );
    describe_counter!(
        "feed_subscriptions_closed_total",
        "Live feed subscriptions closed (any reason)."
    );
    describe_gauge!("feed_subscriptions_active", "Currently open subscriptions.");
    describe_counter!("feed_events_pushed_total", "news-update events written.");
    describe_counter!(
        "feed_write_failures_total",
        "Writes rejected by a subscriber channel."
    );
    describe_gauge!("feed_tick_interval_ms", "Configured tick interval.");
    describe_counter!(
        "timestamp_normalize_failures_total",
        "Timestamps no pattern could read."
    );
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the
    /// configured tick interval.
    pub fn init(feed: &FeedConfig) -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe_series();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        gauge!("feed_tick_interval_ms").set(feed.interval.as_millis() as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
