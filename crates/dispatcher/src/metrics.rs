//! Delivery metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::DeliveryReport;

/// Counters for one sink
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Deliveries answered with 200
    delivered: AtomicU64,
    /// Deliveries answered with any other status
    rejected: AtomicU64,
    /// Requests that never got a response
    transport_failures: AtomicU64,
}

impl DeliveryMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one delivery attempt
    pub fn record(&self, report: &DeliveryReport) {
        let class = status_class(report);
        let counter = if report.transport_failure {
            &self.transport_failures
        } else if report.is_success() {
            &self.delivered
        } else {
            &self.rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("astm_bridge_deliveries_total", "status" => class).increment(1);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
        }
    }
}

/// Low-cardinality label for a report
pub fn status_class(report: &DeliveryReport) -> &'static str {
    if report.transport_failure {
        return "transport";
    }
    match report.status {
        200 => "200",
        401 | 403 => "auth",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Snapshot of delivery metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub rejected: u64,
    pub transport_failures: u64,
}
