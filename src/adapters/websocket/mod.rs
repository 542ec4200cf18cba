//! WebSocket adapters for real-time telemetry viewers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       StreamIngestor                                │
//! │   child stdout / stderr / stdin  ──►  StreamParser (one per stream) │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ SampleEvent
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        BroadcastHub                                 │
//! │   viewer-a (queue)     viewer-b (queue)     viewer-c (queue)        │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ {"event": ..., "data": ...}
//!                                     ▼
//!                             WebSocket handler
//! ```
//!
//! # Components
//!
//! - [`messages`] - Wire protocol types
//! - [`hub`] - Viewer registry and fan-out
//! - [`handler`] - Axum WebSocket upgrade handler
//! - [`ingest`] - Upstream stream to hub bridge

pub mod handler;
pub mod hub;
pub mod ingest;
pub mod messages;

pub use handler::{ws_handler, WebSocketState};
pub use hub::{BroadcastHub, DeliveryReport, DEFAULT_VIEWER_BUFFER};
pub use ingest::{IngestError, IngestSettings, IngestSummary, StreamIngestor};
pub use messages::{ClientMessage, ErrorMessage, PongMessage, ServerMessage, StatusSnapshot};
