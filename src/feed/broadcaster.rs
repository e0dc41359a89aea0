// src/feed/broadcaster.rs
//! Live news feed broadcaster.
//!
//! Every subscription gets its own channel and its own recurring timer; there
//! is no shared fan-out channel and no shared RNG. A tick picks one story
//! uniformly at random from the pool and pushes it to that subscriber only.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::events::FeedEvent;
use super::subscription::{CloseReason, Registry, Slot, Subscription};

pub const DEFAULT_INTERVAL_MS: u64 = 4_000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Tick cadence and per-subscriber channel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub interval: Duration,
    /// Undelivered events a subscriber may hold before a write is rejected.
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Pick one element of `pool` by uniform random index.
pub fn pick<'a, T, R: Rng>(pool: &'a [T], rng: &mut R) -> Option<&'a T> {
    if pool.is_empty() {
        return None;
    }
    pool.get(rng.random_range(0..pool.len()))
}

/// Hands out subscriptions that each tick independently over a fixed pool.
pub struct FeedBroadcaster<T> {
    pool: Arc<[T]>,
    cfg: FeedConfig,
    registry: Arc<Registry<T>>,
}

impl<T> Clone for FeedBroadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            cfg: self.cfg,
            registry: self.registry.clone(),
        }
    }
}

impl<T> FeedBroadcaster<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(pool: Vec<T>, cfg: FeedConfig) -> Self {
        let cfg = FeedConfig {
            interval: cfg.interval.max(Duration::from_millis(1)),
            channel_capacity: cfg.channel_capacity.max(1),
        };
        if pool.is_empty() {
            warn!(target: "feed", "story pool is empty; subscriptions will never tick");
        }
        info!(
            target: "feed",
            pool = pool.len(),
            interval_ms = cfg.interval.as_millis() as u64,
            capacity = cfg.channel_capacity,
            "feed broadcaster initialized"
        );
        Self {
            pool: pool.into(),
            cfg,
            registry: Arc::new(Registry::new()),
        }
    }

    pub fn pool(&self) -> &[T] {
        &self.pool
    }

    pub fn config(&self) -> FeedConfig {
        self.cfg
    }

    /// Number of subscriptions currently open.
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Open a subscription and arm its timer.
    ///
    /// Must be called from within a Tokio runtime. With an empty pool the
    /// subscription is registered but no timer is armed.
    pub fn open(&self) -> (Subscription<T>, mpsc::Receiver<FeedEvent<T>>) {
        let (tx, rx) = mpsc::channel(self.cfg.channel_capacity);
        let slot = self.registry.insert(tx);
        if !self.pool.is_empty() {
            slot.arm(spawn_timer(slot.clone(), self.pool.clone(), self.cfg.interval));
        }
        info!(
            target: "feed",
            subscription = slot.id(),
            active = self.active_count(),
            "subscription opened"
        );
        (Subscription::new(slot), rx)
    }

    /// Open a subscription wrapped as a stream that closes it when dropped.
    pub fn subscribe_stream(&self) -> FeedStream<T> {
        let (subscription, events) = self.open();
        FeedStream {
            events,
            subscription,
        }
    }

    /// Close every open subscription. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let closed = self
            .registry
            .drain()
            .into_iter()
            .filter(|slot| slot.close(CloseReason::Shutdown))
            .count();
        info!(target: "feed", closed, "feed broadcaster shut down");
        closed
    }
}

fn spawn_timer<T>(slot: Arc<Slot<T>>, pool: Arc<[T]>, period: Duration) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        // First tick one full period after subscribing; late ticks are dropped.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let story = {
                let mut rng = rand::rng();
                pick(&pool, &mut rng).cloned()
            };
            let Some(story) = story else {
                break;
            };
            if !slot.push(FeedEvent::news_update(story)) {
                break;
            }
        }
    })
}

/// Event stream of one subscription. Dropping it closes the subscription.
pub struct FeedStream<T> {
    events: mpsc::Receiver<FeedEvent<T>>,
    subscription: Subscription<T>,
}

impl<T> Unpin for FeedStream<T> {}

impl<T> FeedStream<T> {
    pub fn subscription(&self) -> &Subscription<T> {
        &self.subscription
    }
}

impl<T> Stream for FeedStream<T> {
    type Item = FeedEvent<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}
