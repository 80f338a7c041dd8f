//! Broadcast hub
//!
//! Tracks connected subscribers and the current snapshot. A new subscriber
//! gets the current snapshot replayed to it alone; a publish replaces the
//! snapshot and fans it out to everyone connected at that moment.

mod types;

pub use types::{PublishReport, PushEvent, SubscriberId, Subscription};

use crate::kline::Snapshot;
use crate::telemetry::{self, DeliveryKind, GaugeMetric};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;

/// Default per-subscriber queue depth
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// Subscriber queue full; this delivery was dropped
    Dropped,
    /// Receiver gone; subscriber is dead
    Closed,
}

struct HubState {
    latest: Option<Arc<Snapshot>>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<PushEvent>>,
}

/// Fan-out hub shared by the fetcher loop and the connection layer
///
/// Connect, disconnect and publish all hold the same write lock, so a
/// subscriber joining during a publish either gets the old snapshot replayed
/// and then the publish, or only the new snapshot replayed.
pub struct BroadcastHub {
    state: RwLock<HubState>,
    buffer: usize,
}

impl BroadcastHub {
    /// Create a hub whose subscriber queues hold `buffer` events
    pub fn new(buffer: usize) -> Self {
        Self {
            state: RwLock::new(HubState {
                latest: None,
                subscribers: HashMap::new(),
            }),
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber and replay the current snapshot to it
    pub async fn connect(&self) -> Subscription {
        let id = SubscriberId::new();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.attach(id, tx).await;
        Subscription { id, events: rx }
    }

    /// Register `tx` under `id`, replacing any previous sender for that id
    ///
    /// Returns true when the current snapshot was replayed to it.
    pub async fn attach(&self, id: SubscriberId, tx: mpsc::Sender<PushEvent>) -> bool {
        let mut state = self.state.write().await;

        let replay = state
            .latest
            .as_ref()
            .filter(|snapshot| !snapshot.is_empty())
            .cloned();

        let replayed = match replay {
            Some(snapshot) => {
                Self::deliver(id, &tx, PushEvent::KlineData(snapshot), DeliveryKind::Replay)
                    == Delivery::Sent
            }
            None => false,
        };

        if state.subscribers.insert(id, tx).is_some() {
            tracing::debug!(subscriber = %id, "Subscriber re-attached");
        }
        telemetry::set_gauge(GaugeMetric::Subscribers, state.subscribers.len() as f64);

        tracing::info!(
            subscriber = %id,
            subscribers = state.subscribers.len(),
            replayed,
            "Subscriber connected"
        );
        replayed
    }

    /// Remove a subscriber; unknown ids are ignored
    ///
    /// Returns true if the subscriber was registered.
    pub async fn disconnect(&self, id: SubscriberId) -> bool {
        let mut state = self.state.write().await;
        let removed = state.subscribers.remove(&id).is_some();
        telemetry::set_gauge(GaugeMetric::Subscribers, state.subscribers.len() as f64);

        if removed {
            tracing::info!(
                subscriber = %id,
                subscribers = state.subscribers.len(),
                "Subscriber disconnected"
            );
        }
        removed
    }

    /// Replace the current snapshot and deliver it to every subscriber
    ///
    /// Delivery is best-effort per subscriber; subscribers whose receiver is
    /// gone are pruned.
    pub async fn publish(&self, snapshot: Snapshot) -> PublishReport {
        let snapshot = Arc::new(snapshot);
        let mut state = self.state.write().await;
        state.latest = Some(snapshot.clone());
        telemetry::set_gauge(GaugeMetric::SnapshotCandles, snapshot.len() as f64);

        let mut report = PublishReport::default();
        let mut dead = Vec::new();

        for (id, tx) in &state.subscribers {
            let event = PushEvent::KlineData(snapshot.clone());
            match Self::deliver(*id, tx, event, DeliveryKind::Publish) {
                Delivery::Sent => report.delivered += 1,
                Delivery::Dropped => report.dropped += 1,
                Delivery::Closed => dead.push(*id),
            }
        }

        for id in &dead {
            state.subscribers.remove(id);
        }
        report.pruned = dead.len();
        telemetry::set_gauge(GaugeMetric::Subscribers, state.subscribers.len() as f64);

        tracing::debug!(
            candles = snapshot.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            pruned = report.pruned,
            "Snapshot published"
        );
        report
    }

    /// Current snapshot, if any fetch has succeeded
    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.state.read().await.latest.clone()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }

    pub async fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.state.read().await.subscribers.contains_key(&id)
    }

    /// Non-blocking send to one subscriber
    fn deliver(
        id: SubscriberId,
        tx: &mpsc::Sender<PushEvent>,
        event: PushEvent,
        kind: DeliveryKind,
    ) -> Delivery {
        match tx.try_send(event) {
            Ok(()) => {
                telemetry::record_delivery(kind);
                Delivery::Sent
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    subscriber = %id,
                    kind = kind.as_str(),
                    "Subscriber queue full, dropping snapshot"
                );
                telemetry::record_delivery_failure("full");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    subscriber = %id,
                    kind = kind.as_str(),
                    "Subscriber channel closed"
                );
                telemetry::record_delivery_failure("closed");
                Delivery::Closed
            }
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}
