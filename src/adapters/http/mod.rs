//! HTTP adapters - REST and WebSocket endpoints.

pub mod relay;

pub use relay::relay_router;
