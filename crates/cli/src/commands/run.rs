//! `run` command implementation.

use std::process::ExitCode;

use anyhow::{Context, Result};
use contracts::{AuditLog, PayloadSink, RunOutcome};
use dispatcher::{HttpSink, LogSink};
use tracing::{info, warn};

use super::{load_blueprint, shutdown_signal};
use crate::cli::RunArgs;
use crate::pipeline::{PassReport, Pipeline};

/// Execute the `run` command
///
/// Exit code 0 when every file was delivered, 1 when some file failed and 2
/// when there was nothing to process.
pub async fn run_pipeline(args: &RunArgs) -> Result<ExitCode> {
    let mut blueprint = load_blueprint(&args.config)?;

    // Apply CLI overrides
    if let Some(ref endpoint) = args.endpoint {
        info!(endpoint = %endpoint, "Overriding delivery endpoint from CLI");
        blueprint.delivery.endpoint = Some(endpoint.clone());
    }
    if let Some(ref token) = args.token {
        info!("Using bearer token from CLI");
        blueprint.delivery.token = Some(token.clone());
        blueprint.delivery.token_env = None;
        blueprint.delivery.token_file = None;
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        input = %blueprint.directories.input.display(),
        processed = %blueprint.directories.processed.display(),
        backup = %blueprint.directories.backup.display(),
        endpoint = %blueprint.delivery.resolved_endpoint(),
        dry_run = args.dry_run,
        "Configuration loaded"
    );

    let audit = observability::audit_log(&blueprint.audit).context("Failed to open status log")?;

    let report = if args.dry_run {
        info!("Dry run mode - payloads are logged, not sent, files stay queued");
        let pipeline = Pipeline::new(&blueprint, LogSink::new("dry_run"), audit).read_only();
        execute(&pipeline).await?
    } else {
        let sink = HttpSink::from_config(&blueprint.delivery)
            .context("Failed to build delivery client")?;
        let pipeline = Pipeline::new(&blueprint, sink, audit);
        let report = execute(&pipeline).await?;
        let delivery = pipeline.sink().metrics();
        info!(
            delivered = delivery.delivered,
            rejected = delivery.rejected,
            transport_failures = delivery.transport_failures,
            "Delivery totals"
        );
        report
    };

    let Some(report) = report else {
        return Ok(ExitCode::FAILURE);
    };

    observability::record_pass(report.outcome, report.files.len(), report.duration);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize pass report")?;
        println!("{}", json);
    } else {
        report.print_summary();
    }

    info!(outcome = ?report.outcome, "ASTM Bridge pass finished");
    Ok(ExitCode::from(exit_code(report.outcome)))
}

/// Run one pass unless a shutdown signal arrives first
async fn execute<S, A>(pipeline: &Pipeline<S, A>) -> Result<Option<PassReport>>
where
    S: PayloadSink,
    A: AuditLog,
{
    info!("Starting pass...");

    tokio::select! {
        result = pipeline.run_pass() => {
            let report = result.context("Pass failed")?;
            Ok(Some(report))
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, pass interrupted; claimed files are restored on the next pass");
            Ok(None)
        }
    }
}

fn exit_code(outcome: RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Success => 0,
        RunOutcome::Failure => 1,
        RunOutcome::NothingToProcess => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(RunOutcome::Success), 0);
        assert_eq!(exit_code(RunOutcome::Failure), 1);
        assert_eq!(exit_code(RunOutcome::NothingToProcess), 2);
    }
}
