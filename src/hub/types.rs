//! Hub types

use crate::kline::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque subscriber handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event pushed to subscribers
///
/// On the wire: `{"event": "kline_data", "data": [[open_time, open, high, low, close], ...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    KlineData(Arc<Snapshot>),
}

impl PushEvent {
    /// Event name as seen by clients
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::KlineData(_) => "kline_data",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A registered subscriber's receiving end
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub events: mpsc::Receiver<PushEvent>,
}

/// Result of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the snapshot was queued for
    pub delivered: usize,
    /// Subscribers skipped because their queue was full
    pub dropped: usize,
    /// Dead subscribers removed during this publish
    pub pruned: usize,
}
