//! In-process transport.
//!
//! Implements the transport port without any network. Samples are
//! published explicitly with [`InMemoryTransport::publish`] and delivered
//! synchronously on the publishing thread, which makes it suitable both for
//! deterministic tests and for the simulated feed of the `monitor` command.
//!
//! Failures can be injected per domain and setup step, and every successful
//! operation is journaled so teardown order can be checked.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::DomainId;
use crate::domain::telemetry::{TelemetrySample, TopicKind};
use crate::ports::{
    DomainParticipant, MatchedStatus, ParticipantOptions, ReaderHandle, SampleDelivery, SampleInfo,
    SampleListener, TopicHandle, Transport, TransportError,
};

/// Setup step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Join,
    Topic(TopicKind),
    Reader(TopicKind),
}

/// One successful transport operation, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Joined(DomainId),
    TopicCreated(DomainId, TopicKind),
    ReaderCreated(DomainId, TopicKind),
    ReaderDeleted(DomainId, TopicKind),
    TopicDeleted(DomainId, TopicKind),
    Left(DomainId),
}

struct BoundReader {
    kind: TopicKind,
    listener: Arc<dyn SampleListener>,
}

#[derive(Default)]
struct ParticipantState {
    domain: Option<DomainId>,
    topics: HashMap<TopicHandle, TopicKind>,
    readers: HashMap<ReaderHandle, BoundReader>,
}

#[derive(Default)]
struct State {
    next_handle: u64,
    participants: HashMap<u64, ParticipantState>,
    failures: HashSet<(DomainId, FailurePoint)>,
    publishers: HashMap<(DomainId, TopicKind), i32>,
    options: HashMap<DomainId, ParticipantOptions>,
    journal: Vec<TransportOp>,
}

impl State {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn should_fail(&self, domain: DomainId, point: FailurePoint) -> bool {
        self.failures.contains(&(domain, point))
    }
}

/// Transport whose domains live in this process.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<State>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the given setup step fail for `domain` from now on.
    pub fn fail_at(&self, domain: DomainId, point: FailurePoint) {
        self.lock().failures.insert((domain, point));
    }

    /// Delivers a valid, alive sample to every reader of `kind` in `domain`.
    ///
    /// Returns how many readers were invoked.
    pub fn publish(&self, domain: DomainId, kind: TopicKind, sample: TelemetrySample) -> usize {
        self.publish_with_info(domain, kind, sample, SampleInfo::VALID)
    }

    pub fn publish_with_info(
        &self,
        domain: DomainId,
        kind: TopicKind,
        sample: TelemetrySample,
        info: SampleInfo,
    ) -> usize {
        // Listeners are cloned out so callbacks run without the state lock.
        let targets = self.readers_of(domain, kind);
        for (reader, listener) in &targets {
            listener.on_sample(SampleDelivery {
                reader: *reader,
                topic_name: kind.topic_name().to_string(),
                info,
                sample: sample.clone(),
            });
        }
        targets.len()
    }

    /// Registers a publisher on `kind` in `domain` and notifies matching readers.
    pub fn announce_publisher(&self, domain: DomainId, kind: TopicKind) {
        let count = {
            let mut state = self.lock();
            let count = state.publishers.entry((domain, kind)).or_insert(0);
            *count += 1;
            *count
        };
        for (reader, listener) in self.readers_of(domain, kind) {
            listener.on_subscription_matched(reader, kind.topic_name(), matched(count));
        }
    }

    /// Every successful operation so far.
    pub fn journal(&self) -> Vec<TransportOp> {
        self.lock().journal.clone()
    }

    /// Domains that currently have a live participant, ascending.
    pub fn joined_domains(&self) -> Vec<DomainId> {
        let mut domains: Vec<DomainId> = self
            .lock()
            .participants
            .values()
            .filter_map(|p| p.domain)
            .collect();
        domains.sort();
        domains.dedup();
        domains
    }

    pub fn reader_count(&self, domain: DomainId) -> usize {
        self.lock()
            .participants
            .values()
            .filter(|p| p.domain == Some(domain))
            .map(|p| p.readers.len())
            .sum()
    }

    /// Options passed to the most recent successful join of `domain`.
    pub fn join_options(&self, domain: DomainId) -> Option<ParticipantOptions> {
        self.lock().options.get(&domain).cloned()
    }

    fn readers_of(&self, domain: DomainId, kind: TopicKind) -> Vec<(ReaderHandle, Arc<dyn SampleListener>)> {
        let mut targets: Vec<_> = self
            .lock()
            .participants
            .values()
            .filter(|p| p.domain == Some(domain))
            .flat_map(|p| p.readers.iter())
            .filter(|(_, bound)| bound.kind == kind)
            .map(|(handle, bound)| (*handle, bound.listener.clone()))
            .collect();
        targets.sort_by_key(|(handle, _)| *handle);
        targets
    }
}

impl Transport for InMemoryTransport {
    fn join(
        &self,
        domain: DomainId,
        options: &ParticipantOptions,
    ) -> Result<Box<dyn DomainParticipant>, TransportError> {
        let mut state = self.lock();
        if state.should_fail(domain, FailurePoint::Join) {
            return Err(TransportError::Join {
                domain,
                reason: "injected failure".to_string(),
            });
        }
        let id = state.next_handle();
        state.participants.insert(
            id,
            ParticipantState {
                domain: Some(domain),
                ..Default::default()
            },
        );
        state.options.insert(domain, options.clone());
        state.journal.push(TransportOp::Joined(domain));

        Ok(Box::new(InMemoryParticipant {
            id,
            domain,
            state: self.state.clone(),
        }))
    }

    fn leave(&self, participant: Box<dyn DomainParticipant>) -> Result<(), TransportError> {
        let domain = participant.domain();
        let mut state = self.lock();
        let id = state
            .participants
            .iter()
            .find(|(_, p)| p.domain == Some(domain))
            .map(|(id, _)| *id)
            .ok_or_else(|| TransportError::Teardown(format!("domain {} is not joined", domain)))?;
        state.participants.remove(&id);
        state.journal.push(TransportOp::Left(domain));
        Ok(())
    }
}

struct InMemoryParticipant {
    id: u64,
    domain: DomainId,
    state: Arc<Mutex<State>>,
}

impl InMemoryParticipant {
    fn with_participant<T>(
        &self,
        f: impl FnOnce(&mut State, u64) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.participants.contains_key(&self.id) {
            return Err(TransportError::Teardown(format!(
                "participant for domain {} already left",
                self.domain
            )));
        }
        f(&mut state, self.id)
    }
}

impl DomainParticipant for InMemoryParticipant {
    fn domain(&self) -> DomainId {
        self.domain
    }

    fn create_topic(&mut self, kind: TopicKind) -> Result<TopicHandle, TransportError> {
        let domain = self.domain;
        self.with_participant(|state, id| {
            if state.should_fail(domain, FailurePoint::Topic(kind)) {
                return Err(TransportError::Topic {
                    topic: kind.topic_name(),
                    reason: "injected failure".to_string(),
                });
            }
            let handle = TopicHandle(state.next_handle());
            if let Some(participant) = state.participants.get_mut(&id) {
                participant.topics.insert(handle, kind);
            }
            state.journal.push(TransportOp::TopicCreated(domain, kind));
            Ok(handle)
        })
    }

    fn create_reader(
        &mut self,
        topic: TopicHandle,
        listener: Arc<dyn SampleListener>,
    ) -> Result<ReaderHandle, TransportError> {
        let domain = self.domain;
        let (handle, kind, publishers) = self.with_participant(|state, id| {
            let kind = state
                .participants
                .get(&id)
                .and_then(|p| p.topics.get(&topic).copied())
                .ok_or_else(|| TransportError::Reader {
                    topic: "unknown",
                    reason: format!("topic handle {} not found", topic.0),
                })?;
            if state.should_fail(domain, FailurePoint::Reader(kind)) {
                return Err(TransportError::Reader {
                    topic: kind.topic_name(),
                    reason: "injected failure".to_string(),
                });
            }
            let handle = ReaderHandle(state.next_handle());
            if let Some(participant) = state.participants.get_mut(&id) {
                participant.readers.insert(
                    handle,
                    BoundReader {
                        kind,
                        listener: listener.clone(),
                    },
                );
            }
            state.journal.push(TransportOp::ReaderCreated(domain, kind));
            let publishers = state.publishers.get(&(domain, kind)).copied().unwrap_or(0);
            Ok((handle, kind, publishers))
        })?;

        if publishers > 0 {
            listener.on_subscription_matched(handle, kind.topic_name(), matched(publishers));
        }
        Ok(handle)
    }

    fn delete_reader(&mut self, reader: ReaderHandle) -> Result<(), TransportError> {
        let domain = self.domain;
        self.with_participant(|state, id| {
            let bound = state
                .participants
                .get_mut(&id)
                .and_then(|p| p.readers.remove(&reader))
                .ok_or_else(|| TransportError::Teardown(format!("reader {} not found", reader.0)))?;
            state.journal.push(TransportOp::ReaderDeleted(domain, bound.kind));
            Ok(())
        })
    }

    fn delete_topic(&mut self, topic: TopicHandle) -> Result<(), TransportError> {
        let domain = self.domain;
        self.with_participant(|state, id| {
            let participant = state
                .participants
                .get_mut(&id)
                .ok_or_else(|| TransportError::Teardown("participant missing".to_string()))?;
            if participant.readers.values().any(|r| participant.topics.get(&topic) == Some(&r.kind)) {
                return Err(TransportError::Teardown(format!(
                    "topic {} still has readers",
                    topic.0
                )));
            }
            let kind = participant
                .topics
                .remove(&topic)
                .ok_or_else(|| TransportError::Teardown(format!("topic {} not found", topic.0)))?;
            state.journal.push(TransportOp::TopicDeleted(domain, kind));
            Ok(())
        })
    }
}

/// Publishers never unmatch here, so current and total counts agree.
fn matched(publishers: i32) -> MatchedStatus {
    MatchedStatus {
        current_count: publishers,
        total_count: publishers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::{AircraftSource, CoreData};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        samples: AtomicUsize,
        matched: AtomicUsize,
    }

    impl SampleListener for Counting {
        fn on_sample(&self, _delivery: SampleDelivery) {
            self.samples.fetch_add(1, Ordering::SeqCst);
        }

        fn on_subscription_matched(&self, _reader: ReaderHandle, _topic_name: &str, _status: MatchedStatus) {
            self.matched.fetch_add(1, Ordering::SeqCst);
        }
    }

    const CD: TopicKind = TopicKind::Aircraft(AircraftSource::CoreData);

    fn subscribed(transport: &InMemoryTransport, domain: u32, listener: Arc<Counting>) -> Box<dyn DomainParticipant> {
        let mut participant = transport.join(DomainId::new(domain), &ParticipantOptions::default()).unwrap();
        let topic = participant.create_topic(CD).unwrap();
        participant.create_reader(topic, listener).unwrap();
        participant
    }

    #[test]
    fn publish_reaches_only_matching_domain_and_topic() {
        let transport = InMemoryTransport::new();
        let listener = Arc::new(Counting::default());
        let _participant = subscribed(&transport, 1, listener.clone());

        assert_eq!(transport.publish(DomainId::new(1), CD, CoreData::default().into()), 1);
        assert_eq!(transport.publish(DomainId::new(2), CD, CoreData::default().into()), 0);
        assert_eq!(
            transport.publish(DomainId::new(1), TopicKind::Messaging, CoreData::default().into()),
            0
        );
        assert_eq!(listener.samples.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn topic_with_live_reader_cannot_be_deleted() {
        let transport = InMemoryTransport::new();
        let mut participant = transport.join(DomainId::new(0), &ParticipantOptions::default()).unwrap();
        let topic = participant.create_topic(CD).unwrap();
        let reader = participant.create_reader(topic, Arc::new(Counting::default())).unwrap();

        assert!(participant.delete_topic(topic).is_err());
        participant.delete_reader(reader).unwrap();
        participant.delete_topic(topic).unwrap();
        transport.leave(participant).unwrap();
        assert!(transport.joined_domains().is_empty());
    }

    #[test]
    fn matched_status_fires_whichever_side_arrives_first() {
        let transport = InMemoryTransport::new();
        let early = Arc::new(Counting::default());
        let late = Arc::new(Counting::default());

        let _p0 = subscribed(&transport, 0, early.clone());
        transport.announce_publisher(DomainId::new(0), CD);

        transport.announce_publisher(DomainId::new(1), CD);
        let _p1 = subscribed(&transport, 1, late.clone());

        assert_eq!(early.matched.load(Ordering::SeqCst), 1);
        assert_eq!(late.matched.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn injected_failures_surface_as_transport_errors() {
        let transport = InMemoryTransport::new();
        transport.fail_at(DomainId::new(4), FailurePoint::Topic(TopicKind::Intelligence));
        let mut participant = transport.join(DomainId::new(4), &ParticipantOptions::default()).unwrap();

        let err = participant.create_topic(TopicKind::Intelligence).unwrap_err();
        assert!(matches!(err, TransportError::Topic { topic: "IntelligenceTopic", .. }));
        assert!(participant.create_topic(TopicKind::Messaging).is_ok());
    }
}
