//! Transport adapters.
//!
//! - `InMemoryTransport` - In-process domains with failure injection
//! - `SimulatedFeed` - Synthetic publishers driving the in-memory transport

mod in_memory;
mod simulated;

pub use in_memory::{FailurePoint, InMemoryTransport, TransportOp};
pub use simulated::SimulatedFeed;
