//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::{ListenerRole, TransportKind};
use std::path::PathBuf;

/// ASTM Bridge - forwards hematology analyzer results to the ERP backend
#[derive(Parser, Debug)]
#[command(
    name = "astm-bridge",
    author,
    version,
    about = "ASTM analyzer to ERP bridge",
    long_about = "Receives ASTM transmissions from a laboratory analyzer, persists each \n\
                  frame as a write-once file, and forwards the decoded results to the \n\
                  ERP backend one record at a time."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ASTM_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ASTM_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one processing pass over the primary directory
    Run(RunArgs),

    /// Receive frames from the analyzer and store them
    Listen(ListenArgs),

    /// Move backup frames into the primary directory
    Relay(RelayArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "astm-bridge.toml",
        env = "ASTM_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the full delivery endpoint URL
    #[arg(long, env = "ASTM_BRIDGE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bearer token, replaces every configured token source
    #[arg(long, env = "ASTM_BRIDGE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Log payloads instead of sending them; files stay in the queue
    #[arg(long)]
    pub dry_run: bool,

    /// Print the pass report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `listen` command
#[derive(Parser, Debug, Clone)]
pub struct ListenArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "astm-bridge.toml",
        env = "ASTM_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Directory the frames are written to
    #[arg(long, value_enum, default_value = "primary", env = "ASTM_BRIDGE_ROLE")]
    pub role: RoleArg,

    /// Override the listener transport
    #[arg(long, value_enum, env = "ASTM_BRIDGE_TRANSPORT")]
    pub transport: Option<TransportArg>,

    /// Override the TCP bind host
    #[arg(long, env = "ASTM_BRIDGE_HOST")]
    pub host: Option<String>,

    /// Override the TCP bind port
    #[arg(long, env = "ASTM_BRIDGE_PORT")]
    pub port: Option<u16>,

    /// Override the serial device
    #[arg(long, env = "ASTM_BRIDGE_SERIAL_PORT")]
    pub serial_port: Option<String>,

    /// Override the serial baud rate
    #[arg(long, env = "ASTM_BRIDGE_BAUD")]
    pub baud: Option<u32>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "ASTM_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `relay` command
#[derive(Parser, Debug, Clone)]
pub struct RelayArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "astm-bridge.toml",
        env = "ASTM_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "astm-bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "astm-bridge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the test-code translation table
    #[arg(long)]
    pub mapping: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Listener role
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RoleArg {
    Primary,
    Backup,
}

impl From<RoleArg> for ListenerRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Primary => ListenerRole::Primary,
            RoleArg::Backup => ListenerRole::Backup,
        }
    }
}

/// Listener transport
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TransportArg {
    Tcp,
    Serial,
}

impl From<TransportArg> for TransportKind {
    fn from(transport: TransportArg) -> Self {
        match transport {
            TransportArg::Tcp => TransportKind::Tcp,
            TransportArg::Serial => TransportKind::Serial,
        }
    }
}
