//! Pipeline orchestrator - one processing pass over the primary directory.
//!
//! Takes the queue lock, relays the backup backlog, then claims, parses, maps
//! and delivers every pending frame file. Files whose records all reached the
//! backend are archived; the rest stay for the next pass.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use contracts::{
    AuditLog, ContractError, DeviceId, FileOutcome, InterfaceBlueprint, PayloadSink, RunOutcome,
    StatusLabel, StatusRecord,
};
use ingestion::{BackupRelay, ClaimedFrame, FrameQueue, RelayReport};
use protocol::{ProtocolParser, RecordMapper};
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::pipeline::stats::{DeliveryAttempt, FileReport, PassReport};

/// Device id used for pass-level status records
const BATCH_DEVICE: &str = "SDK";

/// Pipeline
///
/// Generic over the delivery sink and the status log so that tests can drive
/// a pass without a network or a log file.
pub struct Pipeline<S, A> {
    queue: FrameQueue,
    relay: BackupRelay,
    processed: PathBuf,
    mapper: RecordMapper,
    sink: S,
    audit: A,
    read_only: bool,
}

impl<S: PayloadSink, A: AuditLog> Pipeline<S, A> {
    /// Create a new pipeline for the configured directories
    pub fn new(blueprint: &InterfaceBlueprint, sink: S, audit: A) -> Self {
        let dirs = &blueprint.directories;
        Self {
            queue: FrameQueue::new(
                &dirs.input,
                Duration::from_secs(blueprint.queue.stale_lock_secs),
            ),
            relay: BackupRelay::from_directories(dirs),
            processed: dirs.processed.clone(),
            mapper: RecordMapper::new(&blueprint.mapping),
            sink,
            audit,
            read_only: false,
        }
    }

    /// Never archive: every claim goes back to the queue after delivery.
    ///
    /// Used for dry runs, whose sink does not reach the backend.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one pass
    ///
    /// Per-file failures are contained in the report; only directory setup and
    /// lock contention abort the pass.
    #[instrument(name = "pipeline_pass", skip(self), fields(sink = %self.sink.name()))]
    pub async fn run_pass(&self) -> Result<PassReport> {
        let started = Instant::now();

        for dir in [self.queue.dir(), self.processed.as_path()] {
            fs::create_dir_all(dir).map_err(|e| ContractError::file_system(dir, e))?;
        }

        let lock = match self.queue.lock() {
            Ok(lock) => lock,
            Err(e) => {
                warn!(error = %e, "pass skipped, work queue lock unavailable");
                self.record(
                    DeviceId::new(BATCH_DEVICE),
                    StatusLabel::Error,
                    "Batch",
                    e.to_string(),
                );
                return Err(e.into());
            }
        };
        self.queue.recover_claims(&lock)?;

        let relay = self.import_backup();

        let names = self.queue.pending()?;
        if names.is_empty() {
            info!("no frame files to process");
            self.record(
                DeviceId::unknown(),
                StatusLabel::NoFiles,
                "File Scan",
                "No unprocessed .astm files found.",
            );
            self.record(
                DeviceId::new(BATCH_DEVICE),
                StatusLabel::NothingToProcess,
                "Batch",
                "",
            );
            return Ok(PassReport {
                outcome: RunOutcome::NothingToProcess,
                relay,
                files: Vec::new(),
                duration: started.elapsed(),
            });
        }

        let scan_device = self.prescan_device(&names[0]);
        info!(files = names.len(), device = %scan_device, "frame files found");
        self.record(
            scan_device.clone(),
            StatusLabel::FilesFound,
            "File Scan",
            format!("{} file(s) found", names.len()),
        );

        let mut files = Vec::with_capacity(names.len());
        let mut lock_lost = false;
        for name in &names {
            if !lock.refresh() {
                error!(remaining = names.len() - files.len(), "pass lock lost, stopping pass");
                lock_lost = true;
                break;
            }
            let report = self.process_file(name, &scan_device).await;
            observability::record_file_outcome(report.outcome);
            files.push(report);
        }

        let outcome = if lock_lost {
            RunOutcome::Failure
        } else {
            RunOutcome::aggregate(files.iter().map(|f| &f.outcome))
        };
        let (label, remarks) = match outcome {
            RunOutcome::Success => (StatusLabel::AllSuccess, "All files processed successfully."),
            _ => (StatusLabel::BatchIssues, "Some files were left for the next pass."),
        };
        self.record(DeviceId::new(BATCH_DEVICE), label, "Batch", remarks);

        drop(lock);

        info!(
            outcome = ?outcome,
            files = files.len(),
            relayed = relay.copied,
            "pass finished"
        );

        Ok(PassReport {
            outcome,
            relay,
            files,
            duration: started.elapsed(),
        })
    }

    fn import_backup(&self) -> RelayReport {
        match self.relay.import(&self.audit) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "backup relay failed, continuing with primary directory");
                self.record(
                    DeviceId::unknown(),
                    StatusLabel::RelayError,
                    "Batch",
                    e.to_string(),
                );
                RelayReport::default()
            }
        }
    }

    /// Device id from the first file, `UNKNOWN` when it cannot be read
    fn prescan_device(&self, name: &str) -> DeviceId {
        let path = self.queue.dir().join(name);
        match fs::read_to_string(&path) {
            Ok(text) => ProtocolParser::device_id(&text).unwrap_or_else(DeviceId::unknown),
            Err(e) => {
                debug!(file = %name, error = %e, "device pre-scan failed");
                DeviceId::unknown()
            }
        }
    }

    #[instrument(name = "pipeline_file", skip(self, scan_device))]
    async fn process_file(&self, name: &str, scan_device: &DeviceId) -> FileReport {
        let claimed = match self.queue.claim(name) {
            Ok(claimed) => claimed,
            Err(e) => {
                error!(error = %e, "failed to claim frame file");
                self.record(scan_device.clone(), StatusLabel::Error, name, e.to_string());
                return FileReport::failed(name, scan_device, e);
            }
        };

        self.record(scan_device.clone(), StatusLabel::Processing, name, "");

        let entries = match claimed
            .read()
            .map_err(|e| e.to_string())
            .and_then(|text| ProtocolParser::parse(&text).map_err(|e| e.to_string()))
        {
            Ok(entries) => entries,
            Err(message) => {
                error!(error = %message, "failed to read frame file");
                self.release(claimed);
                self.record(scan_device.clone(), StatusLabel::Error, name, message.clone());
                return FileReport::failed(name, scan_device, message);
            }
        };

        let device = entries
            .first()
            .and_then(|entry| entry.device_id.clone())
            .unwrap_or_else(|| scan_device.clone());

        let mut deliveries = Vec::with_capacity(entries.len());
        for entry in &entries {
            let payload = self.mapper.map(entry);
            let report = self.sink.deliver(&payload).await;

            let entry_device = entry.device_id.clone().unwrap_or_else(|| device.clone());
            self.record(
                entry_device,
                StatusLabel::DeliveryStatus(report.status),
                name,
                report.body.clone(),
            );
            deliveries.push(DeliveryAttempt {
                test_name: payload.test_data.test_name,
                status: report.status,
                delivered: report.is_success(),
            });
        }

        let mut outcome = FileOutcome::from_deliveries(deliveries.iter().map(|d| d.delivered));
        let mut error = None;

        match outcome {
            FileOutcome::Success if self.read_only => {
                info!(records = deliveries.len(), "read-only pass, file left in queue");
                self.release(claimed);
            }
            FileOutcome::Success => match claimed.archive(&self.processed) {
                Ok(target) => {
                    info!(archived = %target.display(), records = deliveries.len(), "file delivered");
                    self.record(device.clone(), StatusLabel::Processed, name, "");
                }
                Err(e) => {
                    error!(error = %e, "failed to archive delivered file");
                    self.release(claimed);
                    self.record(device.clone(), StatusLabel::Error, name, e.to_string());
                    outcome = FileOutcome::Error;
                    error = Some(e.to_string());
                }
            },
            _ => {
                let failed = deliveries.iter().filter(|d| !d.delivered).count();
                warn!(failed, total = deliveries.len(), "file partially delivered");
                self.release(claimed);
                self.record(
                    device.clone(),
                    StatusLabel::PartialFailure,
                    name,
                    format!("{failed} of {} record(s) not delivered", deliveries.len()),
                );
            }
        }

        FileReport {
            file: name.to_string(),
            device_id: device.to_string(),
            outcome,
            deliveries,
            error,
        }
    }

    fn release(&self, claimed: ClaimedFrame) {
        let name = claimed.name().to_string();
        if let Err(e) = claimed.release() {
            error!(file = %name, error = %e, "failed to return claimed file to the queue");
        }
    }

    fn record(
        &self,
        device: DeviceId,
        status: StatusLabel,
        subject: &str,
        remarks: impl Into<String>,
    ) {
        let record = StatusRecord::new(device, status, subject, remarks);
        if let Err(e) = self.audit.append(record) {
            warn!(status = %status, subject = %subject, error = %e, "failed to write status record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        BackendPayload, DeliveryReport, DirectoryConfig, InterfaceBlueprint, DELIVERY_OK,
    };
    use ingestion::{CLAIM_SUFFIX, LOCK_FILE_NAME};
    use observability::MemoryAuditLog;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    /// Sink answering from a script keyed by test value
    struct ScriptedSink {
        failing_values: Vec<&'static str>,
        seen: Mutex<Vec<BackendPayload>>,
    }

    impl ScriptedSink {
        fn ok() -> Self {
            Self::failing(&[])
        }

        fn failing(values: &[&'static str]) -> Self {
            Self {
                failing_values: values.to_vec(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<BackendPayload> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PayloadSink for ScriptedSink {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn deliver(&self, payload: &BackendPayload) -> DeliveryReport {
            self.seen.lock().unwrap().push(payload.clone());
            if self
                .failing_values
                .contains(&payload.test_data.test_value.as_str())
            {
                DeliveryReport::response(500, "database unavailable")
            } else {
                DeliveryReport::response(DELIVERY_OK, "saved")
            }
        }
    }

    struct Fixture {
        _root: TempDir,
        blueprint: InterfaceBlueprint,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempdir().unwrap();
            let directories = DirectoryConfig {
                input: root.path().join("input"),
                processed: root.path().join("processed"),
                backup: root.path().join("backup"),
                backup_processed: root.path().join("backup_processed"),
            };
            let blueprint = InterfaceBlueprint {
                version: Default::default(),
                listener: Default::default(),
                directories,
                delivery: Default::default(),
                mapping: Default::default(),
                audit: Default::default(),
                queue: Default::default(),
            };
            Self {
                _root: root,
                blueprint,
            }
        }

        fn input(&self) -> &Path {
            &self.blueprint.directories.input
        }

        fn processed(&self) -> &Path {
            &self.blueprint.directories.processed
        }

        fn write_input(&self, name: &str, content: &str) {
            fs::create_dir_all(self.input()).unwrap();
            fs::write(self.input().join(name), content).unwrap();
        }
    }

    fn frame(subject: &str, results: &[(&str, &str)]) -> String {
        let mut text = String::from("\x02H|\\^&|||ADVIA2120|||||||P|1\r");
        text.push_str(&format!("P|1||{subject}\r"));
        for (i, (code, value)) in results.iter().enumerate() {
            text.push_str(&format!("R|{}|{code}|{value}\r", i + 1));
        }
        text.push_str("L|1|N\r\x03\x04");
        text
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_empty_directory_is_nothing_to_process() {
        let fixture = Fixture::new();
        let audit = MemoryAuditLog::new();
        let pipeline = Pipeline::new(&fixture.blueprint, ScriptedSink::ok(), audit.clone());

        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::NothingToProcess);
        assert_eq!(report.outcome.as_option(), None);
        assert!(report.files.is_empty());
        assert_eq!(audit.labels(), vec!["No Files", "Nothing to Process"]);
        // directories are created and the lock is released
        assert!(fixture.processed().is_dir());
        assert!(!fixture.input().join(LOCK_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_three_files_two_archived_one_left() {
        let fixture = Fixture::new();
        fixture.write_input("advia_1.astm", &frame("R-1", &[("RBC", "4.5"), ("WBC", "6.1")]));
        fixture.write_input("advia_2.astm", &frame("R-2", &[("RBC", "4.9"), ("HGB", "bad")]));
        fixture.write_input("advia_3.astm", &frame("R-3", &[("WBC", "7.0")]));

        let audit = MemoryAuditLog::new();
        let pipeline = Pipeline::new(
            &fixture.blueprint,
            ScriptedSink::failing(&["bad"]),
            audit.clone(),
        );

        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Failure);
        assert_eq!(report.outcome.as_option(), Some(false));
        assert_eq!(listing(fixture.processed()), vec!["advia_1.astm", "advia_3.astm"]);
        assert_eq!(listing(fixture.input()), vec!["advia_2.astm"]);

        let partial = &report.files[1];
        assert_eq!(partial.outcome, FileOutcome::Partial);
        // the failing entry does not stop its sibling
        assert_eq!(partial.deliveries.len(), 2);
        assert_eq!(partial.delivered(), 1);
        assert_eq!(pipeline.sink().seen().len(), 5);

        let labels = audit.labels();
        assert_eq!(labels.first().map(String::as_str), Some("Files Found"));
        assert_eq!(labels.last().map(String::as_str), Some("Batch Issues"));
        assert_eq!(labels.iter().filter(|l| *l == "Processed").count(), 2);
        assert_eq!(labels.iter().filter(|l| *l == "Partial Failure").count(), 1);
        assert!(labels.contains(&"ERP Status: 500".to_string()));

        let records = audit.records();
        let status_500 = records
            .iter()
            .find(|r| r.status == StatusLabel::DeliveryStatus(500))
            .unwrap();
        assert_eq!(status_500.remarks, "database unavailable");
        assert_eq!(status_500.subject, "advia_2.astm");
        assert_eq!(status_500.device_id.as_str(), "ADVIA2120");
    }

    #[tokio::test]
    async fn test_all_delivered_is_success() {
        let fixture = Fixture::new();
        fixture.write_input("advia_1.astm", &frame("R-1", &[("RBC", "4.5")]));
        fixture.write_input("advia_2.astm", &frame("R-2", &[("WBC", "6.0")]));

        let audit = MemoryAuditLog::new();
        let pipeline = Pipeline::new(&fixture.blueprint, ScriptedSink::ok(), audit.clone());
        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Success);
        assert!(listing(fixture.input()).is_empty());
        assert_eq!(listing(fixture.processed()).len(), 2);
        assert_eq!(audit.labels().last().map(String::as_str), Some("All Success"));

        let seen = pipeline.sink().seen();
        assert_eq!(seen[0].test_data.test_name, "Measuring weight");
        assert_eq!(seen[0].test_data.rat_no.as_deref(), Some("R-1"));
    }

    #[tokio::test]
    async fn test_unparseable_file_is_error_and_left_in_place() {
        let fixture = Fixture::new();
        // result record without a value field
        fixture.write_input("advia_1.astm", "H|\\^&|||ADVIA2120\rP|1||R-1\rR|1\r\x04");

        let audit = MemoryAuditLog::new();
        let pipeline = Pipeline::new(&fixture.blueprint, ScriptedSink::ok(), audit.clone());
        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Failure);
        assert_eq!(report.files[0].outcome, FileOutcome::Error);
        assert!(report.files[0].error.is_some());
        assert!(pipeline.sink().seen().is_empty());
        assert_eq!(listing(fixture.input()), vec!["advia_1.astm"]);
        assert!(audit.labels().contains(&"Error".to_string()));
    }

    #[tokio::test]
    async fn test_backup_frames_relayed_before_processing() {
        let fixture = Fixture::new();
        let dirs = &fixture.blueprint.directories;
        fs::create_dir_all(&dirs.backup).unwrap();
        fs::write(dirs.backup.join("advia_9.astm"), frame("R-9", &[("WBC", "5.5")])).unwrap();

        let pipeline = Pipeline::new(
            &fixture.blueprint,
            ScriptedSink::ok(),
            MemoryAuditLog::new(),
        );
        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.relay.copied, 1);
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(listing(fixture.processed()), vec!["advia_9.astm"]);
        assert_eq!(listing(&dirs.backup_processed), vec!["advia_9.astm"]);
    }

    #[tokio::test]
    async fn test_interrupted_claim_is_recovered() {
        let fixture = Fixture::new();
        fixture.write_input(
            &format!("advia_1.astm{CLAIM_SUFFIX}"),
            &frame("R-1", &[("RBC", "4.5")]),
        );

        let pipeline = Pipeline::new(
            &fixture.blueprint,
            ScriptedSink::ok(),
            MemoryAuditLog::new(),
        );
        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(listing(fixture.processed()), vec!["advia_1.astm"]);
    }

    #[tokio::test]
    async fn test_held_lock_aborts_pass() {
        let fixture = Fixture::new();
        let dirs = &fixture.blueprint.directories;
        fixture.write_input("advia_1.astm", &frame("R-1", &[("RBC", "4.5")]));
        fs::write(fixture.input().join(LOCK_FILE_NAME), "pid=1").unwrap();
        fs::create_dir_all(&dirs.backup).unwrap();
        fs::write(dirs.backup.join("advia_9.astm"), frame("R-9", &[("WBC", "5.5")])).unwrap();

        let audit = MemoryAuditLog::new();
        let pipeline = Pipeline::new(&fixture.blueprint, ScriptedSink::ok(), audit.clone());
        let err = pipeline.run_pass().await.unwrap_err();

        assert!(matches!(err, crate::error::CliError::PassLocked { .. }));
        assert!(pipeline.sink().seen().is_empty());
        assert!(fixture.input().join("advia_1.astm").exists());
        // relay waits for the lock as well
        assert_eq!(listing(&dirs.backup), vec!["advia_9.astm"]);
        assert!(!fixture.input().join("advia_9.astm").exists());

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, StatusLabel::Error);
        assert_eq!(records[0].subject, "Batch");
        assert_eq!(records[0].device_id.as_str(), BATCH_DEVICE);
    }

    #[tokio::test]
    async fn test_read_only_pass_leaves_files_queued() {
        let fixture = Fixture::new();
        fixture.write_input("advia_1.astm", &frame("R-1", &[("RBC", "4.5"), ("WBC", "6.1")]));

        let audit = MemoryAuditLog::new();
        let pipeline =
            Pipeline::new(&fixture.blueprint, ScriptedSink::ok(), audit.clone()).read_only();
        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.files[0].delivered(), 2);
        assert_eq!(listing(fixture.input()), vec!["advia_1.astm"]);
        assert!(listing(fixture.processed()).is_empty());
        assert!(!audit.labels().contains(&"Processed".to_string()));

        // a later real pass still sends and archives the frame
        let pipeline = Pipeline::new(&fixture.blueprint, ScriptedSink::ok(), audit.clone());
        let report = pipeline.run_pass().await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(pipeline.sink().seen().len(), 2);
        assert_eq!(listing(fixture.processed()), vec!["advia_1.astm"]);
    }

    #[tokio::test]
    async fn test_dry_run_sink_does_not_consume_frames() {
        let fixture = Fixture::new();
        fixture.write_input("advia_1.astm", &frame("R-1", &[("HGB", "13.9")]));

        let pipeline = Pipeline::new(
            &fixture.blueprint,
            dispatcher::LogSink::new("dry_run"),
            MemoryAuditLog::new(),
        )
        .read_only();
        pipeline.run_pass().await.unwrap();

        assert_eq!(listing(fixture.input()), vec!["advia_1.astm"]);
        assert!(listing(fixture.processed()).is_empty());
    }
}
