//! `listen` command implementation.

use anyhow::{Context, Result};
use contracts::{InterfaceBlueprint, ListenerRole, TransportKind};
use ingestion::{FrameListener, ListenerStats};
use tracing::{info, warn};

use super::{load_blueprint, shutdown_signal};
use crate::cli::ListenArgs;

/// Execute the `listen` command
///
/// A TCP listener serves a single instrument connection and returns when it
/// closes; a serial listener reads until the port fails or a shutdown signal
/// arrives.
pub async fn run_listen(args: &ListenArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    let role = ListenerRole::from(args.role);
    info!(
        endpoint = %blueprint.listener.endpoint(),
        role = ?role,
        target = %blueprint.directories.listener_target(role).display(),
        prefix = %blueprint.listener.file_prefix,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)
            .context("Failed to start metrics endpoint")?;
    } else {
        observability::describe_metrics();
    }

    let audit = observability::audit_log(&blueprint.audit).context("Failed to open status log")?;
    let listener = FrameListener::from_blueprint(&blueprint, role, audit);
    let metrics = listener.metrics();

    tokio::select! {
        result = listener.run() => {
            let stats = result.context("Listener stopped")?;
            print_stats("Transmission finished", &stats);
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping listener...");
            print_stats("Listener stopped", &metrics.snapshot());
        }
    }

    info!("ASTM Bridge listener finished");
    Ok(())
}

fn apply_overrides(blueprint: &mut InterfaceBlueprint, args: &ListenArgs) {
    let listener = &mut blueprint.listener;
    if let Some(transport) = args.transport {
        listener.transport = TransportKind::from(transport);
    }
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding TCP host from CLI");
        listener.tcp_host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = port, "Overriding TCP port from CLI");
        listener.tcp_port = port;
    }
    if let Some(ref serial_port) = args.serial_port {
        info!(serial_port = %serial_port, "Overriding serial port from CLI");
        listener.serial_port = Some(serial_port.clone());
    }
    if let Some(baud) = args.baud {
        listener.baud_rate = baud;
    }
}

fn print_stats(title: &str, stats: &ListenerStats) {
    info!(
        frames_stored = stats.frames_stored,
        bytes_read = stats.bytes_read,
        bytes_discarded = stats.bytes_discarded,
        "{title}"
    );
    println!("\n=== {title} ===\n");
    println!("  Frames stored:   {}", stats.frames_stored);
    println!("  Bytes read:      {}", stats.bytes_read);
    println!("  Bytes discarded: {}", stats.bytes_discarded);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn blueprint() -> InterfaceBlueprint {
        serde_json::from_str(
            r#"{"directories": {"input": "in", "processed": "done", "backup": "bk", "backup_processed": "bk_done"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_switch_to_serial() {
        let cli = Cli::try_parse_from([
            "astm-bridge",
            "listen",
            "--transport",
            "serial",
            "--serial-port",
            "COM3",
            "--baud",
            "19200",
        ])
        .unwrap();
        let Commands::Listen(args) = cli.command else {
            panic!("expected listen command");
        };

        let mut blueprint = blueprint();
        apply_overrides(&mut blueprint, &args);

        assert_eq!(blueprint.listener.transport, TransportKind::Serial);
        assert_eq!(blueprint.listener.endpoint(), "COM3@19200");
        assert!(config_loader::ConfigLoader::validate(&blueprint).is_ok());
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let cli = Cli::try_parse_from(["astm-bridge", "listen"]).unwrap();
        let Commands::Listen(args) = cli.command else {
            panic!("expected listen command");
        };

        let mut blueprint = blueprint();
        apply_overrides(&mut blueprint, &args);
        assert_eq!(blueprint.listener.endpoint(), "127.0.0.1:9200");
    }
}
