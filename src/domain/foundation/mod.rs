//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types
//! that form the vocabulary of the telemetry relay.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{DomainId, ViewerId};
pub use timestamp::Timestamp;
