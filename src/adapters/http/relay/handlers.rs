//! HTTP handlers for relay status endpoints.

use axum::extract::{Json, State};
use axum::response::IntoResponse;

use crate::adapters::websocket::{StatusSnapshot, WebSocketState};

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// `GET /api/status` - same snapshot viewers receive on connect.
pub async fn status(State(state): State<WebSocketState>) -> impl IntoResponse {
    let snapshot: StatusSnapshot = state.hub.snapshot().await;
    Json(snapshot)
}
