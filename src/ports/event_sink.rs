//! EventSink port - consumer of reconstructed sample events.
//!
//! The stream ingestor hands every `SampleEvent` to an `EventSink` within the
//! same processing turn that decoded it.

use async_trait::async_trait;

use crate::domain::telemetry::SampleEvent;

/// Consumer of reconstructed events.
///
/// Implementations must not block on slow downstream consumers; delivery is
/// best-effort and never fails the producer.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    async fn deliver(&self, event: SampleEvent);

    /// An upstream stream was attached (`true`) or ended (`false`).
    async fn stream_attached(&self, _attached: bool) {}

    /// Sink name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventSink) {}
}
