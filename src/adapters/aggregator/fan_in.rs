//! FanInAggregator - many domains in, one record stream out.
//!
//! ## Lifecycle
//!
//! 1. [`FanInAggregator::open`] creates one [`DomainSubscriptionContext`] per
//!    requested domain. Domains that fail are logged and skipped; the
//!    stop signal is checked before each domain.
//! 2. [`FanInAggregator::run`] idles until the stop signal fires. Records
//!    are written by transport threads through the shared sink meanwhile.
//! 3. [`FanInAggregator::shutdown`] tears every context down. Each context
//!    stops its listener before releasing readers, so no sample is written
//!    after its context is gone.
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `participant_name` | `telemetry_monitor` | Name announced when joining |
//! | `idle_poll` | 200ms | Idle tick while waiting for the stop signal |

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::DomainId;
use crate::domain::telemetry::DomainSet;
use crate::ports::{CredentialResolver, ParticipantOptions, Transport};

use super::context::{ContextSummary, DomainSubscriptionContext, SetupStage};
use super::sink::SharedSink;

/// Settings for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub participant_name: String,
    pub idle_poll: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            participant_name: "telemetry_monitor".to_string(),
            idle_poll: Duration::from_millis(200),
        }
    }
}

impl AggregatorSettings {
    pub fn with_participant_name(mut self, name: impl Into<String>) -> Self {
        self.participant_name = name.into();
        self
    }

    pub fn with_idle_poll(mut self, interval: Duration) -> Self {
        self.idle_poll = interval;
        self
    }
}

/// One domain that could not be brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDomain {
    pub domain: DomainId,
    /// Setup stage, `None` when credentials could not be resolved.
    pub stage: Option<SetupStage>,
    pub reason: String,
}

/// Outcome of the setup phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub active: Vec<DomainId>,
    pub failed: Vec<FailedDomain>,
    /// Domains never attempted because the stop signal arrived first.
    pub cancelled: Vec<DomainId>,
}

impl SetupReport {
    pub fn is_degraded(&self) -> bool {
        self.active.is_empty()
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub setup: SetupReport,
    pub contexts: Vec<ContextSummary>,
}

impl ShutdownReport {
    pub fn records_emitted(&self) -> u64 {
        self.contexts.iter().map(|c| c.records_emitted).sum()
    }
}

/// Owns every live domain context and the shared sink they write to.
pub struct FanInAggregator {
    transport: Arc<dyn Transport>,
    sink: SharedSink,
    settings: AggregatorSettings,
    credentials: Option<Arc<dyn CredentialResolver>>,
    contexts: Vec<DomainSubscriptionContext>,
}

impl FanInAggregator {
    pub fn new(transport: Arc<dyn Transport>, sink: SharedSink, settings: AggregatorSettings) -> Self {
        Self {
            transport,
            sink,
            settings,
            credentials: None,
            contexts: Vec::new(),
        }
    }

    /// Joins every domain with the material from `resolver`.
    pub fn with_credentials(mut self, resolver: Arc<dyn CredentialResolver>) -> Self {
        self.credentials = Some(resolver);
        self
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    pub fn active_domains(&self) -> Vec<DomainId> {
        self.contexts.iter().map(|c| c.domain()).collect()
    }

    /// Brings up a context per domain not already active.
    pub fn open(&mut self, domains: &DomainSet, shutdown: &watch::Receiver<bool>) -> SetupReport {
        let mut report = SetupReport::default();

        let options = match self.participant_options() {
            Ok(options) => options,
            Err(reason) => {
                tracing::warn!(error = %reason, "credential resolution failed, no domain can be joined");
                report.failed = domains
                    .iter()
                    .map(|domain| FailedDomain {
                        domain,
                        stage: None,
                        reason: reason.clone(),
                    })
                    .collect();
                return report;
            }
        };

        for domain in domains.iter() {
            if *shutdown.borrow() {
                report.cancelled.push(domain);
                continue;
            }
            if self.contexts.iter().any(|c| c.domain() == domain) {
                tracing::debug!(domain = %domain, "domain already active");
                continue;
            }

            match DomainSubscriptionContext::open(self.transport.as_ref(), domain, &options, self.sink.clone()) {
                Ok(context) => {
                    tracing::info!(domain = %domain, topics = context.bindings().len(), "domain context ready");
                    self.contexts.push(context);
                    report.active.push(domain);
                }
                Err(e) => {
                    tracing::warn!(domain = %domain, stage = %e.stage, error = %e.source, "domain setup failed, skipping");
                    report.failed.push(FailedDomain {
                        domain,
                        stage: Some(e.stage),
                        reason: e.source.to_string(),
                    });
                }
            }
        }

        if !report.cancelled.is_empty() {
            tracing::info!(count = report.cancelled.len(), "stop requested during setup");
        }
        report
    }

    /// Sets up `domains`, idles until `shutdown` is raised, then tears down.
    ///
    /// A dropped sender counts as a stop request.
    pub async fn run(mut self, domains: DomainSet, mut shutdown: watch::Receiver<bool>) -> ShutdownReport {
        let setup = self.open(&domains, &shutdown);
        if setup.is_degraded() {
            tracing::warn!(requested = domains.len(), "no domain context is active, idling until stopped");
        } else {
            tracing::info!(active = setup.active.len(), failed = setup.failed.len(), "aggregator running");
        }

        let mut interval = time::interval(self.settings.idle_poll);
        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    tracing::trace!(records = self.sink.records_written(), "aggregator idle");
                }
            }
        }

        tracing::info!("stop requested, tearing down domain contexts");
        let contexts = self.shutdown();
        ShutdownReport { setup, contexts }
    }

    /// Tears down every context in setup order.
    pub fn shutdown(&mut self) -> Vec<ContextSummary> {
        let transport = self.transport.clone();
        self.contexts
            .drain(..)
            .map(|context| {
                let summary = context.teardown(transport.as_ref());
                tracing::info!(
                    domain = %summary.domain,
                    records = summary.records_emitted,
                    teardown_errors = summary.teardown_errors,
                    "domain context closed"
                );
                summary
            })
            .collect()
    }

    fn participant_options(&self) -> Result<ParticipantOptions, String> {
        let credentials = match &self.credentials {
            Some(resolver) => {
                let credentials = resolver.resolve().map_err(|e| e.to_string())?;
                let [identity_ca, certificate, private_key] = credentials.uris();
                tracing::debug!(
                    participant = %credentials.participant,
                    identity_ca = %identity_ca,
                    certificate = %certificate,
                    private_key = %private_key,
                    "participant credentials resolved"
                );
                Some(credentials)
            }
            None => None,
        };
        Ok(ParticipantOptions {
            name: self.settings.participant_name.clone(),
            credentials,
        })
    }
}

impl Drop for FanInAggregator {
    fn drop(&mut self) {
        if !self.contexts.is_empty() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::aggregator::CaptureBuffer;
    use crate::adapters::transport::{FailurePoint, InMemoryTransport};
    use crate::domain::telemetry::{AircraftSource, CoreData, TopicKind};
    use crate::ports::{CredentialError, ParticipantCredentials};
    use std::path::PathBuf;

    fn domains(text: &str) -> DomainSet {
        DomainSet::parse(text).domains
    }

    fn aggregator(transport: &Arc<InMemoryTransport>, buffer: &CaptureBuffer) -> FanInAggregator {
        FanInAggregator::new(
            transport.clone(),
            SharedSink::new(buffer.clone()),
            AggregatorSettings::default().with_idle_poll(Duration::from_millis(5)),
        )
    }

    #[test]
    fn failed_domains_are_skipped_and_others_stay_active() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail_at(DomainId::new(1), FailurePoint::Join);
        transport.fail_at(DomainId::new(3), FailurePoint::Topic(TopicKind::Messaging));
        let buffer = CaptureBuffer::new();
        let mut agg = aggregator(&transport, &buffer);
        let (_tx, rx) = watch::channel(false);

        let report = agg.open(&domains("0-3"), &rx);

        assert_eq!(report.active, vec![DomainId::new(0), DomainId::new(2)]);
        let failed: Vec<(u32, Option<SetupStage>)> =
            report.failed.iter().map(|f| (f.domain.value(), f.stage)).collect();
        assert_eq!(failed, vec![(1, Some(SetupStage::Join)), (3, Some(SetupStage::Topic))]);

        let kind = TopicKind::Aircraft(AircraftSource::CoreData);
        for d in 0..4 {
            transport.publish(DomainId::new(d), kind, CoreData::default().into());
        }
        let text = buffer.text();
        assert!(text.contains("[domain=0] TOPIC: aircraft coredata\n"));
        assert!(text.contains("[domain=2] TOPIC: aircraft coredata\n"));
        assert!(!text.contains("[domain=1]"));
        assert!(!text.contains("[domain=3]"));
    }

    #[test]
    fn opening_twice_does_not_duplicate_contexts() {
        let transport = Arc::new(InMemoryTransport::new());
        let buffer = CaptureBuffer::new();
        let mut agg = aggregator(&transport, &buffer);
        let (_tx, rx) = watch::channel(false);

        agg.open(&domains("4"), &rx);
        let second = agg.open(&domains("4"), &rx);

        assert!(second.active.is_empty());
        assert_eq!(agg.active_domains(), vec![DomainId::new(4)]);
        assert_eq!(transport.reader_count(DomainId::new(4)), 6);
    }

    #[test]
    fn stop_before_setup_cancels_remaining_domains() {
        let transport = Arc::new(InMemoryTransport::new());
        let buffer = CaptureBuffer::new();
        let mut agg = aggregator(&transport, &buffer);
        let (_tx, rx) = watch::channel(true);

        let report = agg.open(&domains("0,1"), &rx);

        assert!(report.active.is_empty());
        assert_eq!(report.cancelled, vec![DomainId::new(0), DomainId::new(1)]);
        assert!(transport.joined_domains().is_empty());
    }

    struct MissingRoot;

    impl CredentialResolver for MissingRoot {
        fn resolve(&self) -> Result<ParticipantCredentials, CredentialError> {
            Err(CredentialError::RootNotFound(PathBuf::from("/nowhere")))
        }
    }

    struct FixedCredentials;

    impl CredentialResolver for FixedCredentials {
        fn resolve(&self) -> Result<ParticipantCredentials, CredentialError> {
            Ok(ParticipantCredentials {
                participant: "node1".to_string(),
                identity_ca: PathBuf::from("/r/ca.pem"),
                identity_certificate: PathBuf::from("/r/cert.pem"),
                private_key: PathBuf::from("/r/key.pem"),
            })
        }
    }

    #[test]
    fn credential_failure_fails_every_domain() {
        let transport = Arc::new(InMemoryTransport::new());
        let buffer = CaptureBuffer::new();
        let mut agg = aggregator(&transport, &buffer).with_credentials(Arc::new(MissingRoot));
        let (_tx, rx) = watch::channel(false);

        let report = agg.open(&domains("0,1,2"), &rx);

        assert!(report.active.is_empty());
        assert_eq!(report.failed.len(), 3);
        assert!(report.failed.iter().all(|f| f.stage.is_none()));
        assert!(transport.joined_domains().is_empty());
    }

    #[test]
    fn resolved_credentials_reach_the_transport() {
        let transport = Arc::new(InMemoryTransport::new());
        let buffer = CaptureBuffer::new();
        let mut agg = aggregator(&transport, &buffer).with_credentials(Arc::new(FixedCredentials));
        let (_tx, rx) = watch::channel(false);

        agg.open(&domains("0"), &rx);

        let options = transport.join_options(DomainId::new(0)).unwrap();
        assert_eq!(options.name, "telemetry_monitor");
        assert_eq!(options.credentials.unwrap().participant, "node1");
    }

    #[tokio::test]
    async fn run_idles_when_every_domain_fails_and_stops_on_signal() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail_at(DomainId::new(0), FailurePoint::Join);
        let buffer = CaptureBuffer::new();
        let agg = aggregator(&transport, &buffer);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(agg.run(domains("0"), rx));
        time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());

        tx.send(true).unwrap();
        let report = time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        assert!(report.setup.is_degraded());
        assert!(report.contexts.is_empty());
    }

    #[tokio::test]
    async fn run_tears_down_and_reports_counts() {
        let transport = Arc::new(InMemoryTransport::new());
        let buffer = CaptureBuffer::new();
        let agg = aggregator(&transport, &buffer);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(agg.run(domains("1,2"), rx));
        while transport.joined_domains().len() < 2 {
            time::sleep(Duration::from_millis(2)).await;
        }
        transport.publish(DomainId::new(2), TopicKind::Intelligence, crate::domain::telemetry::Intelligence::default().into());
        tx.send(true).unwrap();
        let report = time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        assert_eq!(report.setup.active.len(), 2);
        assert_eq!(report.records_emitted(), 1);
        assert!(transport.joined_domains().is_empty());
    }

    #[tokio::test]
    async fn dropped_sender_counts_as_stop() {
        let transport = Arc::new(InMemoryTransport::new());
        let buffer = CaptureBuffer::new();
        let agg = aggregator(&transport, &buffer);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(agg.run(domains("0"), rx));
        drop(tx);

        let report = time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(report.contexts.len(), report.setup.active.len());
    }
}
