//! WebSocket message types for viewers.
//!
//! Defines the protocol between the hub and connected viewers:
//! - Server → Viewer: status snapshot, telemetry events, pong, errors
//! - Viewer → Server: ping, status request
//!
//! Every outbound frame has the shape `{"event": "<name>", "data": {...}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::telemetry::{Category, SampleEvent};

// ============================================
// Server → Viewer Messages
// ============================================

/// All messages the hub sends to viewers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Snapshot sent on connect and on request.
    #[serde(rename = "systemStatus")]
    SystemStatus(StatusSnapshot),

    #[serde(rename = "aircraftData")]
    AircraftData(serde_json::Value),

    #[serde(rename = "intelligence")]
    Intelligence(serde_json::Value),

    #[serde(rename = "messaging")]
    Messaging(serde_json::Value),

    /// Heartbeat response.
    #[serde(rename = "pong")]
    Pong(PongMessage),

    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl ServerMessage {
    /// Channel message carrying the event's viewer payload.
    pub fn from_event(event: &SampleEvent) -> Self {
        let payload = event.payload();
        match event.category() {
            Category::Aircraft => ServerMessage::AircraftData(payload),
            Category::Intelligence => ServerMessage::Intelligence(payload),
            Category::Messaging => ServerMessage::Messaging(payload),
        }
    }

    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::SystemStatus(_) => "systemStatus",
            ServerMessage::AircraftData(_) => "aircraftData",
            ServerMessage::Intelligence(_) => "intelligence",
            ServerMessage::Messaging(_) => "messaging",
            ServerMessage::Pong(_) => "pong",
            ServerMessage::Error(_) => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Hub state as seen by a viewer. Carries counts only, never past events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Distinct (domain, category, subtype) sources seen so far.
    pub sources_seen: usize,
    /// Source labels, e.g. `2/aircraft coredata2`.
    pub sources: Vec<String>,
    /// Events delivered per channel.
    pub event_counts: BTreeMap<String, u64>,
    pub viewers: usize,
    pub active_streams: usize,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

/// Error message sent to a viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

// ============================================
// Viewer → Server Messages
// ============================================

/// All messages a viewer may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    RequestStatus,
}
