//! WebSocket upgrade handler for viewer connections.
//!
//! Manages the connection lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Register the viewer with the hub (status snapshot is queued first)
//! 3. Forward queued messages and answer viewer requests until disconnect
//! 4. Remove the viewer from the hub

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::domain::foundation::{Timestamp, ViewerId};

use super::{
    hub::BroadcastHub,
    messages::{ClientMessage, ErrorMessage, PongMessage, ServerMessage},
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub hub: Arc<BroadcastHub>,
}

impl WebSocketState {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }
}

/// Handle WebSocket upgrade requests from viewers.
///
/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Runs for the lifetime of one viewer connection.
async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (mut sender, mut receiver) = socket.split();
    let (viewer_id, mut queue) = hub.join().await;

    // Forward queued hub messages to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            if let Err(e) = send_message(&mut sender, &message).await {
                tracing::debug!(viewer_id = %viewer_id, error = %e, "send failed, closing connection");
                break;
            }
        }
    });

    // Handle incoming viewer messages
    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => handle_client_text(&recv_hub, viewer_id, &text).await,
                Ok(Message::Binary(_)) => {
                    tracing::warn!(viewer_id = %viewer_id, "unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level heartbeats are answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(viewer_id = %viewer_id, "viewer sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(viewer_id = %viewer_id, error = %e, "receive error");
                    break;
                }
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.leave(&viewer_id).await;
}

async fn handle_client_text(hub: &BroadcastHub, viewer_id: ViewerId, text: &str) {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => {
            tracing::trace!(viewer_id = %viewer_id, "ping");
            ServerMessage::Pong(PongMessage {
                timestamp: Timestamp::now().to_rfc3339(),
            })
        }
        Ok(ClientMessage::RequestStatus) => ServerMessage::SystemStatus(hub.snapshot().await),
        Err(e) => {
            tracing::debug!(viewer_id = %viewer_id, error = %e, "unrecognized viewer message");
            ServerMessage::Error(ErrorMessage {
                code: "invalid_message".to_string(),
                message: e.to_string(),
                timestamp: Timestamp::now().to_rfc3339(),
            })
        }
    };

    if !hub.send_to(&viewer_id, reply).await {
        tracing::debug!(viewer_id = %viewer_id, "reply dropped, viewer queue unavailable");
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = msg.to_json().map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}
