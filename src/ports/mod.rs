//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay core and the outside world. Adapters implement these ports.
//!
//! - `Transport` - publish-subscribe layer the aggregator subscribes through
//! - `CredentialResolver` - participant authentication material
//! - `EventSink` - consumer of reconstructed sample events

mod credentials;
mod event_sink;
mod transport;

pub use credentials::{CredentialError, CredentialResolver, ParticipantCredentials};
pub use event_sink::EventSink;
pub use transport::{
    DomainParticipant, MatchedStatus, ParticipantOptions, ReaderHandle, SampleDelivery,
    SampleInfo, SampleListener, TopicHandle, Transport, TransportError,
};
