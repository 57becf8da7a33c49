//! HttpSink - POST backend records to the ERP

use std::sync::Arc;
use std::time::Duration;

use contracts::{BackendPayload, DeliveryConfig, DeliveryReport, PayloadSink};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use tracing::{debug, error, instrument, warn};

use crate::credentials::{token_source, TokenSource};
use crate::error::DispatcherError;
use crate::metrics::{DeliveryMetrics, MetricsSnapshot};

/// Delivers one payload per request with a bearer token
pub struct HttpSink {
    name: String,
    endpoint: String,
    client: Client,
    token: Arc<dyn TokenSource>,
    metrics: Arc<DeliveryMetrics>,
}

impl HttpSink {
    /// Create a new HttpSink
    ///
    /// `timeout` of `None` waits indefinitely.
    pub fn new(
        endpoint: impl Into<String>,
        token: Arc<dyn TokenSource>,
        timeout: Option<Duration>,
    ) -> Result<Self, DispatcherError> {
        let endpoint = endpoint.into();
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DispatcherError::client_build(&endpoint, e))?;

        Ok(Self {
            name: "http".to_string(),
            endpoint,
            client,
            token,
            metrics: Arc::new(DeliveryMetrics::new()),
        })
    }

    /// Endpoint, token source and timeout from the `[delivery]` section
    pub fn from_config(config: &DeliveryConfig) -> Result<Self, DispatcherError> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::new(config.resolved_endpoint(), token_source(config), timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn send(&self, payload: &BackendPayload) -> DeliveryReport {
        let mut request = self.client.post(&self.endpoint).json(payload);
        match self.token.token() {
            Ok(Some(token)) => {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            Ok(None) => debug!("no credential configured, sending without authorization"),
            Err(e) => warn!(error = %e, "credential unavailable, sending without authorization"),
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return DeliveryReport::transport_failure(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => DeliveryReport::response(status, body),
            Err(e) => DeliveryReport::response(status, format!("<unreadable body: {e}>")),
        }
    }

    fn log_report(&self, report: &DeliveryReport) {
        if report.transport_failure {
            error!(endpoint = %self.endpoint, error = %report.body, "delivery transport failure");
        } else if report.is_success() {
            debug!(status = report.status, "delivered");
        } else if report.is_auth_rejected() {
            warn!(status = report.status, body = %report.body, "authentication rejected by backend");
        } else {
            warn!(status = report.status, body = %report.body, "backend rejected record");
        }
    }
}

impl PayloadSink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_sink_deliver",
        skip(self, payload),
        fields(test = %payload.test_data.test_name)
    )]
    async fn deliver(&self, payload: &BackendPayload) -> DeliveryReport {
        let report = self.send(payload).await;
        self.log_report(&report);
        self.metrics.record(&report);
        report
    }
}
