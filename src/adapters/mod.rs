//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the relay core to external systems:
//! - `aggregator` - Fan-in of per-domain samples into one record stream
//! - `transport` - In-memory and simulated publish-subscribe transports
//! - `credentials` - Participant credential discovery on the filesystem
//! - `stream` - Record stream reconstruction
//! - `websocket` - Broadcast hub and viewer connections
//! - `http` - Axum routes

pub mod aggregator;
pub mod credentials;
pub mod http;
pub mod stream;
pub mod transport;
pub mod websocket;

pub use aggregator::{FanInAggregator, SharedSink};
pub use stream::StreamParser;
pub use websocket::{BroadcastHub, StreamIngestor};
