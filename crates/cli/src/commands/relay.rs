//! `relay` command implementation.

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use ingestion::{BackupRelay, FrameQueue};
use tracing::info;

use super::load_blueprint;
use crate::cli::RelayArgs;

/// Execute the `relay` command
pub fn run_relay(args: &RelayArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let audit = observability::audit_log(&blueprint.audit).context("Failed to open status log")?;

    // relay only into a queue no pass is working on
    let queue = FrameQueue::new(
        &blueprint.directories.input,
        Duration::from_secs(blueprint.queue.stale_lock_secs),
    );
    fs::create_dir_all(queue.dir())
        .with_context(|| format!("Failed to create {}", queue.dir().display()))?;
    let _lock = queue.lock().context("Cannot relay while a pass is running")?;

    let relay = BackupRelay::from_directories(&blueprint.directories);
    let report = relay
        .import(audit.as_ref())
        .with_context(|| {
            format!(
                "Failed to relay {}",
                blueprint.directories.backup.display()
            )
        })?;

    info!(
        copied = report.copied,
        duplicates = report.duplicates,
        mismatched = report.mismatched,
        failed = report.failed,
        "Relay finished"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize relay report")?;
        println!("{}", json);
    } else {
        println!("\n=== Backup Relay ===\n");
        println!("  From:       {}", blueprint.directories.backup.display());
        println!("  To:         {}", blueprint.directories.input.display());
        println!("  Copied:     {}", report.copied);
        println!("  Duplicates: {}", report.duplicates);
        println!("  Mismatched: {}", report.mismatched);
        println!("  Failed:     {}", report.failed);
        println!();
    }

    Ok(())
}
