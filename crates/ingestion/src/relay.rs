//! BackupRelay - migrate the fallback listener's backlog into the primary queue
//!
//! Each backup frame is copied into the primary directory unless a file of the
//! same name is already there, then the source is archived. A failed copy
//! leaves the source in place for the next pass.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use contracts::{is_frame_file_name, AuditLog, DeviceId, DirectoryConfig, StatusLabel, StatusRecord};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::audit::record;
use crate::error::{IngestionError, Result};
use crate::queue::CLAIM_SUFFIX;
use crate::store::{publish, remove_quietly};

/// Counters for one relay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayReport {
    /// Copied into the primary directory
    pub copied: usize,
    /// Already present with identical content
    pub duplicates: usize,
    /// Already present with different content
    pub mismatched: usize,
    /// Copy or archive failed; source left in place
    pub failed: usize,
}

impl RelayReport {
    pub fn total(&self) -> usize {
        self.copied + self.duplicates + self.mismatched + self.failed
    }
}

enum Placement {
    Copied,
    Duplicate,
    Mismatch,
}

/// Backup → primary relay
#[derive(Debug, Clone)]
pub struct BackupRelay {
    backup: PathBuf,
    primary: PathBuf,
    archive: PathBuf,
}

impl BackupRelay {
    pub fn new(
        backup: impl Into<PathBuf>,
        primary: impl Into<PathBuf>,
        archive: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backup: backup.into(),
            primary: primary.into(),
            archive: archive.into(),
        }
    }

    pub fn from_directories(dirs: &DirectoryConfig) -> Self {
        Self::new(&dirs.backup, &dirs.input, &dirs.backup_processed)
    }

    /// Relay every backup frame.
    ///
    /// A missing backup directory means there is nothing to relay. Per-file
    /// failures are counted and audited; only directory-level failures are
    /// returned as errors.
    #[instrument(name = "relay_import", skip(self, audit), fields(backup = %self.backup.display()))]
    pub fn import(&self, audit: &dyn AuditLog) -> Result<RelayReport> {
        let mut report = RelayReport::default();

        let names = match list_frames(&self.backup) {
            Ok(names) => names,
            Err(IngestionError::FileSystem { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!("backup directory absent, nothing to relay");
                return Ok(report);
            }
            Err(e) => return Err(e),
        };
        if names.is_empty() {
            return Ok(report);
        }

        fs::create_dir_all(&self.primary).map_err(|e| IngestionError::fs(&self.primary, e))?;
        fs::create_dir_all(&self.archive).map_err(|e| IngestionError::fs(&self.archive, e))?;

        for name in &names {
            let source = self.backup.join(name);

            let placement = match self.place(&source, name) {
                Ok(placement) => placement,
                Err(e) => {
                    warn!(file = %name, error = %e, "relay copy failed, source kept");
                    report.failed += 1;
                    count("failed");
                    record(audit, relay_record(StatusLabel::RelayError, name, e.to_string()));
                    continue;
                }
            };

            let archived = self.archive.join(name);
            if let Err(e) = move_file(&source, &archived) {
                warn!(file = %name, error = %e, "failed to archive relayed backup file");
                report.failed += 1;
                count("failed");
                record(
                    audit,
                    relay_record(StatusLabel::RelayError, name, format!("archive failed: {e}")),
                );
                continue;
            }

            match placement {
                Placement::Copied => {
                    report.copied += 1;
                    count("copied");
                    record(audit, relay_record(StatusLabel::Relayed, name, "copied to primary"));
                }
                Placement::Duplicate => {
                    report.duplicates += 1;
                    count("duplicate");
                    record(
                        audit,
                        relay_record(StatusLabel::RelayDuplicate, name, "already in primary"),
                    );
                }
                Placement::Mismatch => {
                    report.mismatched += 1;
                    count("mismatch");
                    record(
                        audit,
                        relay_record(
                            StatusLabel::RelayMismatch,
                            name,
                            "primary copy differs, backup content archived",
                        ),
                    );
                }
            }
        }

        info!(
            copied = report.copied,
            duplicates = report.duplicates,
            mismatched = report.mismatched,
            failed = report.failed,
            "backup relay finished"
        );
        Ok(report)
    }

    fn place(&self, source: &Path, name: &str) -> std::io::Result<Placement> {
        let target = self.primary.join(name);
        let claimed = self.primary.join(format!("{name}{CLAIM_SUFFIX}"));
        // a claimed frame is still in the queue under its original name
        let existing = [&target, &claimed].into_iter().find(|p| p.exists());
        if let Some(existing) = existing {
            if fs::read(source)? == fs::read(existing)? {
                debug!(file = %name, "duplicate backup file skipped");
                return Ok(Placement::Duplicate);
            }
            warn!(file = %name, "backup file differs from primary copy of the same name");
            return Ok(Placement::Mismatch);
        }

        let tmp = self.primary.join(format!(".{name}.relay.tmp"));
        fs::copy(source, &tmp)?;
        match publish(&tmp, &target) {
            Ok(()) => Ok(Placement::Copied),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // appeared between the check and the link
                remove_quietly(&tmp);
                Ok(Placement::Duplicate)
            }
            Err(e) => {
                remove_quietly(&tmp);
                Err(e)
            }
        }
    }
}

/// Sorted frame file names in `dir`
pub(crate) fn list_frames(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| IngestionError::fs(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestionError::fs(dir, e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_frame_file_name(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Rename, falling back to copy + remove across filesystems
pub(crate) fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !from.exists() {
                return Err(rename_err);
            }
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

fn relay_record(status: StatusLabel, name: &str, remarks: impl Into<String>) -> StatusRecord {
    StatusRecord::new(DeviceId::unknown(), status, name, remarks)
}

fn count(result: &'static str) {
    metrics::counter!("astm_bridge_relay_total", "result" => result).increment(1);
}
