//! Analytics sink for telemetry events.
//!
//! The sink contract is fire-and-forget: implementations must swallow their
//! own failures so a broken telemetry backend can never surface to the user
//! or interrupt an in-flight request.

use serde_json::Value;

/// Destination for telemetry events recorded by the telemetry plugin.
pub trait AnalyticsSink: Send + Sync {
    /// Record one event with structured attributes. Must not fail or block.
    fn track(&self, event: &str, attributes: Value);

    /// Flush any buffered events. Called once at proxy shutdown.
    fn flush(&self) {}
}

/// Default sink that logs events at debug level instead of shipping them
/// anywhere. Useful for local runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyticsSink for TracingSink {
    fn track(&self, event: &str, attributes: Value) {
        tracing::debug!(event, %attributes, "analytics event");
    }
}
