//! PayloadSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for backend delivery.

use crate::{BackendPayload, DeliveryReport};

/// Backend delivery trait
///
/// All delivery implementations (HTTP, dry-run log, test doubles) implement this trait.
#[trait_variant::make(PayloadSink: Send)]
pub trait LocalPayloadSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one payload
    ///
    /// Never fails: transport problems are folded into the returned report
    /// so that one bad entry cannot stop its siblings.
    async fn deliver(&self, payload: &BackendPayload) -> DeliveryReport;
}
