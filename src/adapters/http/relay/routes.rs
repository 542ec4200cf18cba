//! HTTP routes for the relay.

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{ws_handler, WebSocketState};

use super::handlers::{health, status};

/// Creates the relay router: health, status snapshot and the viewer socket.
///
/// With no configured origins CORS is permissive.
pub fn relay_router(state: WebSocketState, cors_origins: &[String]) -> Router {
    Router::new()
        // GET /ws
        .route("/ws", get(ws_handler))
        // GET /health
        .route("/health", get(health))
        // GET /api/status
        .route("/api/status", get(status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::BroadcastHub;
    use crate::domain::foundation::{DomainId, Timestamp};
    use crate::domain::telemetry::{RecordHeader, SampleEvent, TopicKind};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(hub: Arc<BroadcastHub>) -> Router {
        relay_router(WebSocketState::new(hub), &[])
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app(Arc::new(BroadcastHub::default()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn status_reports_hub_counts() {
        let hub = Arc::new(BroadcastHub::default());
        let header = RecordHeader::new(DomainId::new(4), TopicKind::Intelligence);
        hub.broadcast(&SampleEvent::assemble(header, Default::default(), Timestamp::now()))
            .await;

        let response = app(hub)
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["sourcesSeen"], 1);
        assert_eq!(value["eventCounts"]["intelligence"], 1);
        assert_eq!(value["viewers"], 0);
    }

    #[tokio::test]
    async fn plain_get_on_ws_is_rejected() {
        let response = app(Arc::new(BroadcastHub::default()))
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[test]
    fn invalid_origins_fall_back_to_permissive() {
        let _ = cors_layer(&["bad\norigin".to_string()]);
        let _ = cors_layer(&["http://localhost:3000".to_string()]);
    }
}
