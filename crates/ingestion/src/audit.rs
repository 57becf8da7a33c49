use contracts::{AuditLog, StatusRecord};
use tracing::warn;

/// Append to the audit log; a storage failure is logged and never aborts the caller
pub(crate) fn record(audit: &dyn AuditLog, entry: StatusRecord) {
    let status = entry.status;
    if let Err(e) = audit.append(entry) {
        warn!(%status, error = %e, "failed to append audit record");
    }
}
