//! Bounded-inbox event bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::metrics;

/// Payload delivered in place of an event that could not be serialized.
pub const SERIALIZATION_FALLBACK: &str =
    r#"{"type":"error","message":"event serialization failed"}"#;

type Channels = HashMap<String, HashMap<u64, mpsc::Sender<String>>>;

#[derive(Debug)]
struct Inner {
    capacity: usize,
    next_id: AtomicU64,
    channels: Mutex<Channels>,
}

/// Channel-keyed fan-out of JSON events.
///
/// Cheaply cloneable; all clones share the same subscriber set.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Create a bus whose subscriber inboxes hold `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn channels(&self) -> MutexGuard<'_, Channels> {
        self.inner.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new subscriber on `channel`.
    pub fn subscribe(&self, channel: &str) -> (u64, Inbox) {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels()
            .entry(channel.to_string())
            .or_default()
            .insert(id, tx);
        debug!(channel = %channel, subscription_id = id, "Subscriber added");
        (id, Inbox { rx })
    }

    /// Like [`subscribe`](Self::subscribe), but unsubscribes when the
    /// returned handle is dropped.
    pub fn subscription(&self, channel: &str) -> Subscription {
        let (id, inbox) = self.subscribe(channel);
        Subscription {
            bus: self.clone(),
            channel: channel.to_string(),
            id,
            inbox,
        }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, channel: &str, id: u64) {
        let mut channels = self.channels();
        if let Some(subscribers) = channels.get_mut(channel) {
            if subscribers.remove(&id).is_some() {
                debug!(channel = %channel, subscription_id = id, "Subscriber removed");
            }
            if subscribers.is_empty() {
                channels.remove(channel);
            }
        }
    }

    /// Deliver `event` to every subscriber of `channel` without waiting.
    ///
    /// Returns how many inboxes accepted the event. A full inbox misses this
    /// event; a closed inbox is removed.
    pub fn publish<T: Serialize + ?Sized>(&self, channel: &str, event: &T) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Event serialization failed");
                SERIALIZATION_FALLBACK.to_string()
            }
        };

        let mut channels = self.channels();
        let Some(subscribers) = channels.get_mut(channel) else {
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::EVENTS_DROPPED.inc();
                debug!(channel = %channel, subscription_id = *id, "Inbox full; event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(channel = %channel, subscription_id = *id, "Inbox closed; pruning subscriber");
                false
            }
        });
        if subscribers.is_empty() {
            channels.remove(channel);
        }

        metrics::EVENTS_PUBLISHED.inc_by(delivered as u64);
        delivered
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels().get(channel).map_or(0, HashMap::len)
    }

    /// Total subscribers across all channels.
    pub fn total_subscribers(&self) -> usize {
        self.channels().values().map(HashMap::len).sum()
    }
}

/// Outcome of [`Inbox::recv_timeout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    /// A serialized event.
    Event(String),
    /// Nothing arrived within the timeout.
    KeepAlive,
    /// The subscriber was removed from the bus.
    Closed,
}

/// Receiving side of one subscription.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<String>,
}

impl Inbox {
    /// Wait for the next event. `None` once the subscriber has been removed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Polled {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => Polled::Event(event),
            Ok(None) => Polled::Closed,
            Err(_) => Polled::KeepAlive,
        }
    }
}

/// Subscription that removes itself from the bus on drop.
#[derive(Debug)]
pub struct Subscription {
    bus: EventBus,
    channel: String,
    id: u64,
    inbox: Inbox,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub async fn recv_timeout(&mut self, timeout: Duration) -> Polled {
        self.inbox.recv_timeout(timeout).await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.inbox.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.channel, self.id);
    }
}
