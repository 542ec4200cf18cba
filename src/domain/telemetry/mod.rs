//! Telemetry vocabulary shared by both sides of the relay.
//!
//! - `category` - closed topic model (`TopicKind`, `Category`, `AircraftSource`)
//! - `domain_set` - domain selection grammar
//! - `samples` - typed transport samples
//! - `record` - Raw Record wire format
//! - `event` - reconstructed `SampleEvent`

mod category;
mod domain_set;
mod event;
mod record;
mod samples;

pub use category::{AircraftSource, Category, TopicKind};
pub use domain_set::{DomainSelection, DomainSet, DEFAULT_DOMAINS, MAX_RANGE_SPAN};
pub use event::SampleEvent;
pub use record::{RawRecord, RecordHeader, HEADER_PREFIX, PAYLOAD_MARKER};
pub use samples::{CoreData, Intelligence, MessagingPacket, TelemetrySample};
