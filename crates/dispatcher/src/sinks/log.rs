//! LogSink - dry-run delivery via tracing

use contracts::{BackendPayload, DeliveryReport, PayloadSink, DELIVERY_OK};
use tracing::{info, instrument, warn};

/// Sink that logs payloads instead of sending them
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PayloadSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_deliver", skip(self, payload), fields(sink = %self.name))]
    async fn deliver(&self, payload: &BackendPayload) -> DeliveryReport {
        match serde_json::to_string(payload) {
            Ok(json) => info!(payload = %json, "dry run, payload not sent"),
            Err(e) => warn!(error = %e, "dry run, payload not serializable"),
        }
        DeliveryReport::response(DELIVERY_OK, "dry run")
    }
}
