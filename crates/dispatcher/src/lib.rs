//! # Dispatcher
//!
//! Backend delivery module.
//!
//! Responsibilities:
//! - POST `BackendPayload` records to the ERP (`HttpSink`)
//! - Resolve the bearer token per request (`TokenSource`)
//! - Fold every outcome, transport failures included, into a `DeliveryReport`
//! - Dry-run delivery through tracing (`LogSink`)

pub mod credentials;
pub mod error;
pub mod metrics;
pub mod sinks;

pub use contracts::{DeliveryReport, PayloadSink};
pub use credentials::{token_source, EnvToken, NoToken, StaticToken, TokenFile, TokenSource};
pub use error::DispatcherError;
pub use metrics::{DeliveryMetrics, MetricsSnapshot};
pub use sinks::{HttpSink, LogSink};
