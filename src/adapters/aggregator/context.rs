//! Subscription state for one domain.
//!
//! A context joins its domain, creates one topic and one reader per
//! [`TopicKind`], and registers a single [`DomainListener`] with every reader
//! so all categories of the domain funnel through one serialization point.
//! A context that fails part-way releases what it created and reports the
//! failure; it is never retried.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::domain::foundation::DomainId;
use crate::domain::telemetry::{RawRecord, RecordHeader, TelemetrySample, TopicKind};
use crate::ports::{
    DomainParticipant, MatchedStatus, ParticipantOptions, ReaderHandle, SampleDelivery,
    SampleListener, TopicHandle, Transport, TransportError,
};

use super::sink::SharedSink;

/// Setup step at which a context failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    Join,
    Topic,
    Reader,
}

impl std::fmt::Display for SetupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SetupStage::Join => "join",
            SetupStage::Topic => "topic",
            SetupStage::Reader => "reader",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("domain {domain} setup failed at {stage}: {source}")]
pub struct ContextError {
    pub domain: DomainId,
    pub stage: SetupStage,
    #[source]
    pub source: TransportError,
}

/// One bound topic: category, topic handle and reader handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicBinding {
    pub kind: TopicKind,
    pub topic: TopicHandle,
    pub reader: ReaderHandle,
}

/// What a context did over its lifetime, reported at teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSummary {
    pub domain: DomainId,
    pub records_emitted: u64,
    pub teardown_errors: usize,
}

/// Live subscription state for exactly one domain.
pub struct DomainSubscriptionContext {
    domain: DomainId,
    participant: Box<dyn DomainParticipant>,
    bindings: Vec<TopicBinding>,
    listener: Arc<DomainListener>,
}

impl DomainSubscriptionContext {
    /// Joins `domain` and binds every known topic.
    pub fn open(
        transport: &dyn Transport,
        domain: DomainId,
        options: &ParticipantOptions,
        sink: SharedSink,
    ) -> Result<Self, ContextError> {
        let mut participant = transport.join(domain, options).map_err(|source| ContextError {
            domain,
            stage: SetupStage::Join,
            source,
        })?;
        tracing::debug!(domain = %domain, "participant created");

        let listener = Arc::new(DomainListener::new(domain, sink));
        let mut topics: Vec<(TopicKind, TopicHandle)> = Vec::with_capacity(TopicKind::ALL.len());
        let mut readers: Vec<ReaderHandle> = Vec::with_capacity(TopicKind::ALL.len());

        for kind in TopicKind::ALL {
            match participant.create_topic(kind) {
                Ok(topic) => topics.push((kind, topic)),
                Err(source) => {
                    release(transport, participant, &listener, &readers, &topics);
                    return Err(ContextError {
                        domain,
                        stage: SetupStage::Topic,
                        source,
                    });
                }
            }
        }

        for (_, topic) in &topics {
            let shared: Arc<dyn SampleListener> = listener.clone();
            match participant.create_reader(*topic, shared) {
                Ok(reader) => readers.push(reader),
                Err(source) => {
                    release(transport, participant, &listener, &readers, &topics);
                    return Err(ContextError {
                        domain,
                        stage: SetupStage::Reader,
                        source,
                    });
                }
            }
        }

        let bindings = topics
            .iter()
            .zip(&readers)
            .map(|(&(kind, topic), &reader)| TopicBinding { kind, topic, reader })
            .collect();

        Ok(Self {
            domain,
            participant,
            bindings,
            listener,
        })
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    pub fn bindings(&self) -> &[TopicBinding] {
        &self.bindings
    }

    pub fn records_emitted(&self) -> u64 {
        self.listener.emitted()
    }

    /// Stops emission, waits for any in-flight callback, then releases
    /// readers, topics and finally the participant.
    pub fn teardown(self, transport: &dyn Transport) -> ContextSummary {
        let Self {
            domain,
            mut participant,
            bindings,
            listener,
        } = self;

        listener.close();

        let mut errors = 0;
        for binding in &bindings {
            if let Err(e) = participant.delete_reader(binding.reader) {
                tracing::warn!(domain = %domain, topic = %binding.kind, error = %e, "failed to delete reader");
                errors += 1;
            }
        }
        for binding in &bindings {
            if let Err(e) = participant.delete_topic(binding.topic) {
                tracing::warn!(domain = %domain, topic = %binding.kind, error = %e, "failed to delete topic");
                errors += 1;
            }
        }
        if let Err(e) = transport.leave(participant) {
            tracing::warn!(domain = %domain, error = %e, "failed to leave domain");
            errors += 1;
        }

        ContextSummary {
            domain,
            records_emitted: listener.emitted(),
            teardown_errors: errors,
        }
    }
}

impl std::fmt::Debug for DomainSubscriptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainSubscriptionContext")
            .field("domain", &self.domain)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Releases a partially built context in reverse order.
fn release(
    transport: &dyn Transport,
    mut participant: Box<dyn DomainParticipant>,
    listener: &DomainListener,
    readers: &[ReaderHandle],
    topics: &[(TopicKind, TopicHandle)],
) {
    listener.close();
    for reader in readers {
        if let Err(e) = participant.delete_reader(*reader) {
            tracing::debug!(error = %e, "rollback: delete reader failed");
        }
    }
    for (_, topic) in topics {
        if let Err(e) = participant.delete_topic(*topic) {
            tracing::debug!(error = %e, "rollback: delete topic failed");
        }
    }
    if let Err(e) = transport.leave(participant) {
        tracing::debug!(error = %e, "rollback: leave failed");
    }
}

/// The per-domain callback sink shared by every reader of a context.
///
/// Formats each delivered sample into a Raw Record outside any shared lock,
/// then hands it to the [`SharedSink`].
pub(crate) struct DomainListener {
    domain: DomainId,
    sink: SharedSink,
    sequences: Mutex<HashMap<ReaderHandle, u64>>,
    // Callbacks hold a read guard while emitting; close() takes the write
    // guard, so it returns only once in-flight callbacks are done.
    gate: RwLock<()>,
    closed: AtomicBool,
    emitted: AtomicU64,
}

impl DomainListener {
    fn new(domain: DomainId, sink: SharedSink) -> Self {
        Self {
            domain,
            sink,
            sequences: Mutex::new(HashMap::new()),
            gate: RwLock::new(()),
            closed: AtomicBool::new(false),
            emitted: AtomicU64::new(0),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        drop(self.gate.write().unwrap_or_else(PoisonError::into_inner));
    }

    fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Numbers and writes one record. The sequence guard is held across the
    /// write so a reader's records reach the sink in sequence order.
    fn emit(&self, reader: ReaderHandle, topic: TopicKind, fields: Map<String, Value>) -> io::Result<()> {
        let mut sequences = self.sequences.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = sequences.entry(reader).or_insert(0);
        *counter += 1;
        let record = RawRecord::new(RecordHeader::new(self.domain, topic), *counter, fields);
        self.sink.write_record(&record)
    }
}

impl SampleListener for DomainListener {
    fn on_sample(&self, delivery: SampleDelivery) {
        let _in_flight = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::SeqCst) || !delivery.info.is_emittable() {
            return;
        }

        let Some(topic) = TopicKind::from_topic_name(&delivery.topic_name) else {
            tracing::warn!(domain = %self.domain, topic = %delivery.topic_name, "sample from unknown topic dropped");
            return;
        };
        if !sample_matches_topic(&delivery.sample, topic) {
            tracing::warn!(
                domain = %self.domain,
                topic = %topic,
                sample_type = delivery.sample.type_name(),
                "sample type does not match topic, dropped"
            );
            return;
        }

        let fields = match delivery.sample.fields() {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(domain = %self.domain, topic = %topic, error = %e, "sample projection failed");
                return;
            }
        };
        match self.emit(delivery.reader, topic, fields) {
            Ok(()) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(domain = %self.domain, topic = %topic, error = %e, "failed to write record");
            }
        }
    }

    fn on_subscription_matched(&self, _reader: ReaderHandle, topic_name: &str, status: MatchedStatus) {
        tracing::info!(
            domain = %self.domain,
            topic = %topic_name,
            current_count = status.current_count,
            total_count = status.total_count,
            "subscription matched change"
        );
    }
}

fn sample_matches_topic(sample: &TelemetrySample, topic: TopicKind) -> bool {
    matches!(
        (sample, topic),
        (TelemetrySample::CoreData(_), TopicKind::Aircraft(_))
            | (TelemetrySample::Intelligence(_), TopicKind::Intelligence)
            | (TelemetrySample::Messaging(_), TopicKind::Messaging)
    )
}
