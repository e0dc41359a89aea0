// src/feed/subscription.rs
//! Per-connection subscription slots.
//!
//! A slot is `Open` while its connection is alive and owns the sending half of
//! the connection's channel plus the handle of its tick timer. Every exit path
//! (explicit close, dropped handle, rejected write, shutdown) goes through
//! [`Slot::close`], which swaps the slot to `Closed` under its lock. A tick
//! only writes while holding that same lock and seeing `Open`, so once
//! `close` has returned no further event can reach the subscriber.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::events::FeedEvent;

/// Lifecycle of a subscription. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Open,
    Closed,
}

/// Why a subscription was torn down (logged only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` called on the handle.
    Requested,
    /// The handle (and with it the response stream) was dropped.
    Disconnected,
    /// The subscriber's channel rejected a write.
    WriteFailed,
    /// Broadcaster-wide shutdown.
    Shutdown,
}

enum SlotInner<T> {
    Open {
        tx: mpsc::Sender<FeedEvent<T>>,
        timer: Option<JoinHandle<()>>,
    },
    Closed,
}

pub(crate) struct Slot<T> {
    id: u64,
    inner: Mutex<SlotInner<T>>,
    registry: Weak<Registry<T>>,
}

fn lock<X>(m: &Mutex<X>) -> MutexGuard<'_, X> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Slot<T> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> SubscriptionState {
        match *lock(&self.inner) {
            SlotInner::Open { .. } => SubscriptionState::Open,
            SlotInner::Closed => SubscriptionState::Closed,
        }
    }

    /// Attach the tick timer. If the slot closed in the meantime the timer is
    /// cancelled right away.
    pub(crate) fn arm(&self, handle: JoinHandle<()>) {
        let mut inner = lock(&self.inner);
        match &mut *inner {
            SlotInner::Open { timer, .. } => *timer = Some(handle),
            SlotInner::Closed => handle.abort(),
        }
    }

    /// Write one event without blocking. Returns `false` once the slot is
    /// closed, including when this very write was rejected.
    pub(crate) fn push(&self, event: FeedEvent<T>) -> bool {
        let rejected = {
            let inner = lock(&self.inner);
            match &*inner {
                SlotInner::Closed => return false,
                SlotInner::Open { tx, .. } => tx.try_send(event).is_err(),
            }
        };

        if rejected {
            counter!("feed_write_failures_total").increment(1);
            self.close(CloseReason::WriteFailed);
            return false;
        }
        counter!("feed_events_pushed_total").increment(1);
        true
    }

    /// Transition to `Closed`. Returns `true` only for the call that actually
    /// performed the transition.
    pub(crate) fn close(&self, reason: CloseReason) -> bool {
        let previous = std::mem::replace(&mut *lock(&self.inner), SlotInner::Closed);
        let SlotInner::Open { tx, timer } = previous else {
            return false;
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        drop(tx);

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        counter!("feed_subscriptions_closed_total").increment(1);
        gauge!("feed_subscriptions_active").decrement(1.0);
        info!(target: "feed", subscription = self.id, ?reason, "subscription closed");
        true
    }
}

/// Open slots, keyed by subscription id.
pub(crate) struct Registry<T> {
    slots: Mutex<HashMap<u64, Arc<Slot<T>>>>,
    next_id: AtomicU64,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create and register a new open slot around `tx`.
    pub(crate) fn insert(self: &Arc<Self>, tx: mpsc::Sender<FeedEvent<T>>) -> Arc<Slot<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot {
            id,
            inner: Mutex::new(SlotInner::Open { tx, timer: None }),
            registry: Arc::downgrade(self),
        });
        lock(&self.slots).insert(id, slot.clone());
        counter!("feed_subscriptions_opened_total").increment(1);
        gauge!("feed_subscriptions_active").increment(1.0);
        debug!(target: "feed", subscription = id, "subscription registered");
        slot
    }

    fn remove(&self, id: u64) {
        lock(&self.slots).remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    /// Take every registered slot out of the registry.
    pub(crate) fn drain(&self) -> Vec<Arc<Slot<T>>> {
        lock(&self.slots).drain().map(|(_, slot)| slot).collect()
    }
}

/// Owning handle for one live subscription.
///
/// Dropping the handle closes the subscription, so a response stream that
/// holds it releases the timer as soon as the transport lets go of it.
pub struct Subscription<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot }
    }

    pub fn id(&self) -> u64 {
        self.slot.id()
    }

    pub fn state(&self) -> SubscriptionState {
        self.slot.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SubscriptionState::Open
    }

    /// Cancel the timer and release the channel. Idempotent.
    pub fn close(&self) {
        self.slot.close(CloseReason::Requested);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.slot.close(CloseReason::Disconnected);
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
