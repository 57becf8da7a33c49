//! Pass report.

use contracts::{FileOutcome, RunOutcome};
use ingestion::RelayReport;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// One delivery attempt within a file
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAttempt {
    pub test_name: String,
    pub status: u16,
    pub delivered: bool,
}

/// Result of processing one frame file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub device_id: String,
    pub outcome: FileOutcome,
    pub deliveries: Vec<DeliveryAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub(crate) fn failed(file: &str, device_id: &str, error: impl ToString) -> Self {
        Self {
            file: file.to_string(),
            device_id: device_id.to_string(),
            outcome: FileOutcome::Error,
            deliveries: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn delivered(&self) -> usize {
        self.deliveries.iter().filter(|d| d.delivered).count()
    }
}

/// Result of one orchestrator pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub outcome: RunOutcome,
    pub relay: RelayReport,
    pub files: Vec<FileReport>,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl PassReport {
    /// Count of files per outcome
    pub fn count(&self, outcome: FileOutcome) -> usize {
        self.files.iter().filter(|f| f.outcome == outcome).count()
    }

    /// Total records delivered across all files
    pub fn records_delivered(&self) -> usize {
        self.files.iter().map(FileReport::delivered).sum()
    }

    /// Total delivery attempts across all files
    pub fn records_attempted(&self) -> usize {
        self.files.iter().map(|f| f.deliveries.len()).sum()
    }

    /// Print a human-readable summary
    pub fn print_summary(&self) {
        println!();
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Processing Pass                         ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ Outcome:           {:>40} ║", format!("{:?}", self.outcome));
        println!(
            "║ Duration:          {:>37.2} s ║",
            self.duration.as_secs_f64()
        );
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ Relayed from backup:   {:>37} ║", self.relay.copied);
        println!("║ Relay duplicates:      {:>37} ║", self.relay.duplicates);
        println!("║ Relay mismatches:      {:>37} ║", self.relay.mismatched);
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ Files processed:       {:>37} ║", self.files.len());
        println!(
            "║   Archived:            {:>37} ║",
            self.count(FileOutcome::Success)
        );
        println!(
            "║   Partial:             {:>37} ║",
            self.count(FileOutcome::Partial)
        );
        println!(
            "║   Error:               {:>37} ║",
            self.count(FileOutcome::Error)
        );
        println!(
            "║ Records delivered:     {:>37} ║",
            format!("{}/{}", self.records_delivered(), self.records_attempted())
        );
        println!("╚══════════════════════════════════════════════════════════════╝");

        let troubled: Vec<_> = self
            .files
            .iter()
            .filter(|f| f.outcome != FileOutcome::Success)
            .collect();
        if !troubled.is_empty() {
            println!("\nLeft for the next pass:");
            for file in troubled {
                match &file.error {
                    Some(error) => println!("  - {} ({})", file.file, error),
                    None => println!(
                        "  - {} ({}/{} delivered)",
                        file.file,
                        file.delivered(),
                        file.deliveries.len()
                    ),
                }
            }
        }
        println!();
    }
}
