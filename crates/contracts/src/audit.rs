//! StatusRecord / AuditLog - the durable trail of pipeline behavior
//!
//! Every step of listening, relaying and processing emits a status record.
//! The store behind [`AuditLog`] is owned by a collaborator outside the core.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use crate::{ContractError, DeviceId};

/// Status label of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    /// Primary directory empty at scan time
    NoFiles,
    /// Scan found frame files
    FilesFound,
    /// A file is being processed
    Processing,
    /// One delivery attempt returned this status
    DeliveryStatus(u16),
    /// File archived after full delivery
    Processed,
    /// Some deliveries of a file failed
    PartialFailure,
    /// Read/parse/archive failure for a file
    Error,
    /// Pass finished with every file delivered
    AllSuccess,
    /// Pass finished with at least one failed file
    BatchIssues,
    /// Pass finished without files
    NothingToProcess,
    /// Listener persisted a frame
    FrameStored,
    /// Listener stopped on a transport failure
    ListenerError,
    /// Backup file copied into the primary directory
    Relayed,
    /// Backup file already present in the primary directory
    RelayDuplicate,
    /// Duplicate name with different content
    RelayMismatch,
    /// Backup file could not be copied
    RelayError,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFiles => f.write_str("No Files"),
            Self::FilesFound => f.write_str("Files Found"),
            Self::Processing => f.write_str("Processing"),
            Self::DeliveryStatus(code) => write!(f, "ERP Status: {code}"),
            Self::Processed => f.write_str("Processed"),
            Self::PartialFailure => f.write_str("Partial Failure"),
            Self::Error => f.write_str("Error"),
            Self::AllSuccess => f.write_str("All Success"),
            Self::BatchIssues => f.write_str("Batch Issues"),
            Self::NothingToProcess => f.write_str("Nothing to Process"),
            Self::FrameStored => f.write_str("Frame Stored"),
            Self::ListenerError => f.write_str("Listener Error"),
            Self::Relayed => f.write_str("Relayed"),
            Self::RelayDuplicate => f.write_str("Relay Duplicate"),
            Self::RelayMismatch => f.write_str("Relay Mismatch"),
            Self::RelayError => f.write_str("Relay Error"),
        }
    }
}

impl Serialize for StatusLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One audit record
#[derive(Debug, Clone, Serialize)]
pub struct StatusRecord {
    /// Local wall-clock time of the event
    pub timestamp: DateTime<Local>,

    /// Instrument the event relates to (`UNKNOWN`, `SDK`, ...)
    pub device_id: DeviceId,

    pub status: StatusLabel,

    /// File name or step name ("File Scan", "Batch", ...)
    pub subject: String,

    /// Free text
    pub remarks: String,
}

impl StatusRecord {
    /// Create a record stamped with the current time
    pub fn new(
        device_id: DeviceId,
        status: StatusLabel,
        subject: impl Into<String>,
        remarks: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            device_id,
            status,
            subject: subject.into(),
            remarks: remarks.into(),
        }
    }
}

/// Append-only status store
///
/// Implementations must be cheap to call from the hot path; failures are
/// reported but never abort the pipeline step that produced the record.
pub trait AuditLog: Send + Sync {
    /// Append one record
    ///
    /// # Errors
    /// Returns the storage failure (callers log and continue)
    fn append(&self, record: StatusRecord) -> Result<(), ContractError>;
}

impl<T: AuditLog + ?Sized> AuditLog for std::sync::Arc<T> {
    fn append(&self, record: StatusRecord) -> Result<(), ContractError> {
        (**self).append(record)
    }
}

impl<T: AuditLog + ?Sized> AuditLog for &T {
    fn append(&self, record: StatusRecord) -> Result<(), ContractError> {
        (**self).append(record)
    }
}
