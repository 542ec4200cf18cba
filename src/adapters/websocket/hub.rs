//! Broadcast hub: the set of connected viewers and fan-out to them.
//!
//! ```text
//! StreamParser ──► BroadcastHub ──┬── viewer-a (bounded queue)
//!                                 ├── viewer-b
//!                                 └── viewer-c
//! ```
//!
//! Each viewer owns a small bounded queue drained by its connection task.
//! Delivery uses `try_send`: a full queue skips that viewer for this event
//! only, a closed queue removes the viewer. The producer never waits on a
//! viewer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::{DomainId, Timestamp, ViewerId};
use crate::domain::telemetry::{Category, SampleEvent, TopicKind};
use crate::ports::EventSink;

use super::messages::{ServerMessage, StatusSnapshot};

/// Default per-viewer queue capacity.
pub const DEFAULT_VIEWER_BUFFER: usize = 64;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub skipped: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
struct HubStats {
    sources: BTreeSet<(DomainId, TopicKind)>,
    event_counts: BTreeMap<&'static str, u64>,
    active_streams: usize,
}

/// Holds the connected viewers and fans events out to them.
///
/// # Thread Safety
///
/// Uses `RwLock` for the viewer registry since broadcasts (reads) vastly
/// outnumber connects and disconnects (writes).
pub struct BroadcastHub {
    viewers: RwLock<HashMap<ViewerId, mpsc::Sender<ServerMessage>>>,
    stats: RwLock<HubStats>,
    viewer_buffer: usize,
}

impl BroadcastHub {
    /// Create a hub whose viewers each queue up to `viewer_buffer` messages.
    pub fn new(viewer_buffer: usize) -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            stats: RwLock::new(HubStats::default()),
            viewer_buffer: viewer_buffer.max(1),
        }
    }

    pub fn with_default_buffer() -> Self {
        Self::new(DEFAULT_VIEWER_BUFFER)
    }

    /// Registers a new viewer.
    ///
    /// The returned receiver already holds the status snapshot.
    pub async fn join(&self) -> (ViewerId, mpsc::Receiver<ServerMessage>) {
        let viewer_id = ViewerId::new();
        let (tx, rx) = mpsc::channel(self.viewer_buffer);

        self.viewers.write().await.insert(viewer_id, tx.clone());

        let snapshot = self.snapshot().await;
        // Fresh queue with capacity >= 1, cannot be full.
        let _ = tx.try_send(ServerMessage::SystemStatus(snapshot));
        tracing::info!(viewer_id = %viewer_id, "viewer connected");

        (viewer_id, rx)
    }

    /// Removes a viewer. Unknown ids are ignored.
    pub async fn leave(&self, viewer_id: &ViewerId) {
        if self.viewers.write().await.remove(viewer_id).is_some() {
            tracing::info!(viewer_id = %viewer_id, "viewer disconnected");
        }
    }

    /// Queues a message for one viewer. Returns false if it was not queued.
    pub async fn send_to(&self, viewer_id: &ViewerId, message: ServerMessage) -> bool {
        let viewers = self.viewers.read().await;
        match viewers.get(viewer_id) {
            Some(tx) => tx.try_send(message).is_ok(),
            None => false,
        }
    }

    /// Delivers `event` to every connected viewer.
    pub async fn broadcast(&self, event: &SampleEvent) -> DeliveryReport {
        {
            let mut stats = self.stats.write().await;
            stats.sources.insert((event.domain, event.topic));
            *stats.event_counts.entry(event.channel()).or_insert(0) += 1;
        }

        let message = ServerMessage::from_event(event);
        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();
        {
            let viewers = self.viewers.read().await;
            for (viewer_id, tx) in viewers.iter() {
                match tx.try_send(message.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        report.skipped += 1;
                        tracing::debug!(viewer_id = %viewer_id, channel = event.channel(), "viewer queue full, skipping");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*viewer_id),
                }
            }
        }

        if !closed.is_empty() {
            let mut viewers = self.viewers.write().await;
            for viewer_id in &closed {
                viewers.remove(viewer_id);
                tracing::debug!(viewer_id = %viewer_id, "viewer gone, removed");
            }
            report.removed = closed.len();
        }

        report
    }

    /// Current counts.
    pub async fn snapshot(&self) -> StatusSnapshot {
        let viewers = self.viewers.read().await.len();
        let stats = self.stats.read().await;

        let mut event_counts: BTreeMap<String, u64> = Category::ALL
            .iter()
            .map(|c| (c.channel().to_string(), 0))
            .collect();
        for (channel, count) in &stats.event_counts {
            event_counts.insert((*channel).to_string(), *count);
        }

        StatusSnapshot {
            sources_seen: stats.sources.len(),
            sources: stats
                .sources
                .iter()
                .map(|(domain, topic)| format!("{}/{}", domain, topic))
                .collect(),
            event_counts,
            viewers,
            active_streams: stats.active_streams,
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }

    pub async fn viewer_count(&self) -> usize {
        self.viewers.read().await.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::with_default_buffer()
    }
}

#[async_trait]
impl EventSink for BroadcastHub {
    async fn deliver(&self, event: SampleEvent) {
        self.broadcast(&event).await;
    }

    async fn stream_attached(&self, attached: bool) {
        let mut stats = self.stats.write().await;
        if attached {
            stats.active_streams += 1;
        } else {
            stats.active_streams = stats.active_streams.saturating_sub(1);
        }
    }

    fn name(&self) -> &'static str {
        "BroadcastHub"
    }
}
