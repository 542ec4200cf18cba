//! Relay HTTP adapter module.
//!
//! Provides the viewer WebSocket endpoint and status queries.

pub mod handlers;
pub mod routes;

pub use routes::relay_router;
