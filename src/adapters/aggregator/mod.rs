//! Fan-in aggregation of per-domain samples into one record stream.
//!
//! - `SharedSink` - Exclusive-write output stream shared by all listeners
//! - `DomainSubscriptionContext` - Topics, readers and listener for one domain
//! - `FanInAggregator` - Owns the contexts, runs until the stop signal

mod context;
mod fan_in;
mod sink;

pub use context::{ContextError, ContextSummary, DomainSubscriptionContext, SetupStage, TopicBinding};
pub use fan_in::{AggregatorSettings, FailedDomain, FanInAggregator, SetupReport, ShutdownReport};
pub use sink::{CaptureBuffer, SharedSink};
