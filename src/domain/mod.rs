//! Domain layer containing the telemetry vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `telemetry` - Categories, samples, record format and sample events

pub mod foundation;
pub mod telemetry;
