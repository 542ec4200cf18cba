//! Transport port - the publish-subscribe layer the aggregator reads from.
//!
//! The relay never implements the transport itself. It needs exactly three
//! capabilities from it: join a numbered domain, bind a reader to a topic
//! with a listener, and have the listener invoked when a sample arrives.
//!
//! ## Threading
//!
//! Listeners are invoked on transport-owned threads. A transport may use one
//! thread per domain, one per reader, or a shared pool; listeners must not
//! assume any of these.
//!
//! ## Teardown
//!
//! Teardown mirrors setup in reverse: readers, then topics, then the domain
//! participant via [`Transport::leave`].

use std::sync::Arc;

use crate::domain::foundation::DomainId;
use crate::domain::telemetry::{TelemetrySample, TopicKind};

use super::credentials::ParticipantCredentials;

/// Opaque handle to a topic created inside one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicHandle(pub u64);

/// Opaque handle to a reader bound inside one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReaderHandle(pub u64);

/// Errors reported by the transport. The aggregator treats every one of them
/// as "skip this domain".
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("failed to join domain {domain}: {reason}")]
    Join { domain: DomainId, reason: String },

    #[error("failed to create topic {topic}: {reason}")]
    Topic { topic: &'static str, reason: String },

    #[error("failed to create reader for {topic}: {reason}")]
    Reader { topic: &'static str, reason: String },

    #[error("teardown failed: {0}")]
    Teardown(String),
}

/// Options used when joining a domain.
#[derive(Debug, Clone, Default)]
pub struct ParticipantOptions {
    /// Participant name announced to the domain.
    pub name: String,
    /// Authentication and encryption material, when security is enabled.
    pub credentials: Option<ParticipantCredentials>,
}

/// Per-sample metadata supplied by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    /// The publishing instance is still alive.
    pub alive: bool,
    /// The sample carries data (not just a lifecycle notification).
    pub valid_data: bool,
}

impl SampleInfo {
    pub const VALID: SampleInfo = SampleInfo {
        alive: true,
        valid_data: true,
    };

    pub fn is_emittable(&self) -> bool {
        self.alive && self.valid_data
    }
}

impl Default for SampleInfo {
    fn default() -> Self {
        Self::VALID
    }
}

/// One sample delivered to a listener.
#[derive(Debug, Clone)]
pub struct SampleDelivery {
    pub reader: ReaderHandle,
    /// Name of the topic the delivering reader is bound to.
    pub topic_name: String,
    pub info: SampleInfo,
    pub sample: TelemetrySample,
}

/// Subscription match status change for one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedStatus {
    pub current_count: i32,
    pub total_count: i32,
}

/// Callback sink registered with readers.
pub trait SampleListener: Send + Sync {
    /// Called on a transport thread for every delivered sample.
    fn on_sample(&self, delivery: SampleDelivery);

    /// Called when the set of matched publishers changes.
    fn on_subscription_matched(&self, _reader: ReaderHandle, _topic_name: &str, _status: MatchedStatus) {}
}

/// A joined domain. Owned by exactly one subscription context.
pub trait DomainParticipant: Send {
    fn domain(&self) -> DomainId;

    fn create_topic(&mut self, kind: TopicKind) -> Result<TopicHandle, TransportError>;

    fn create_reader(
        &mut self,
        topic: TopicHandle,
        listener: Arc<dyn SampleListener>,
    ) -> Result<ReaderHandle, TransportError>;

    /// After this returns the transport dispatches no further samples for
    /// the reader.
    fn delete_reader(&mut self, reader: ReaderHandle) -> Result<(), TransportError>;

    fn delete_topic(&mut self, topic: TopicHandle) -> Result<(), TransportError>;
}

/// Entry point of the transport.
pub trait Transport: Send + Sync {
    fn join(
        &self,
        domain: DomainId,
        options: &ParticipantOptions,
    ) -> Result<Box<dyn DomainParticipant>, TransportError>;

    /// Releases a participant. Called last during teardown.
    fn leave(&self, participant: Box<dyn DomainParticipant>) -> Result<(), TransportError>;
}
