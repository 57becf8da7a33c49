//! AuditLog implementations
//!
//! - `JsonlAuditLog`: append-only JSON-lines file, one `StatusRecord` per line
//! - `TracingAuditLog`: records emitted as tracing events only
//! - `MemoryAuditLog`: in-memory, for tests and embedding callers

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use contracts::{AuditLog, ContractError, StatusRecord};

/// JSON-lines status log
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditLog {
    /// Open `path` for appending, creating parent directories
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ContractError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ContractError::file_system(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ContractError::file_system(&path, e))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonlAuditLog {
    fn append(&self, record: StatusRecord) -> Result<(), ContractError> {
        tracing::debug!(status = %record.status, subject = %record.subject, "audit");

        let mut line = serde_json::to_string(&record)
            .map_err(|e| ContractError::Other(format!("audit record not serializable: {e}")))?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| ContractError::Other("audit log mutex poisoned".to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| ContractError::file_system(&self.path, e))
    }
}

/// Emits each record as an `info` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn append(&self, record: StatusRecord) -> Result<(), ContractError> {
        tracing::info!(
            target: "astm_bridge::audit",
            device_id = %record.device_id,
            status = %record.status,
            subject = %record.subject,
            remarks = %record.remarks,
            "status"
        );
        Ok(())
    }
}

/// Shared in-memory log
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    records: Arc<Mutex<Vec<StatusRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything appended so far
    pub fn records(&self) -> Vec<StatusRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Status labels in append order, as display text
    pub fn labels(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|record| record.status.to_string())
            .collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, record: StatusRecord) -> Result<(), ContractError> {
        self.records
            .lock()
            .map_err(|_| ContractError::Other("audit log mutex poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}
