//! Telemetry Relay - multi-domain telemetry aggregation and live fan-out
//!
//! The `monitor` side subscribes to several isolated pub-sub domains and
//! serializes every sample into one text record stream. The `serve` side
//! reconstructs typed events from that stream and broadcasts them to
//! connected WebSocket viewers.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
