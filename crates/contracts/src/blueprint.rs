//! InterfaceBlueprint - Config Loader output
//!
//! Describes the full bridge configuration: listener transport, working
//! directories, backend delivery, record mapping constants and audit output.
//! Every component receives the section it needs at construction time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::CallMode;

/// Tenant used when the configured user name carries no `@tenant` suffix
pub const DEFAULT_TENANT: &str = "LMS_002";

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Instrument-facing transport
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Working directories (primary queue, archives, fallback)
    pub directories: DirectoryConfig,

    /// Backend endpoint and credentials
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Record mapping constants
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Status log output
    #[serde(default)]
    pub audit: AuditConfig,

    /// Work-queue locking
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Listener transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Tcp,
    Serial,
}

/// Which directory a listener writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerRole {
    /// Writes straight into the processing queue
    #[default]
    Primary,
    /// Fallback listener; frames wait in the backup directory for the relay
    Backup,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default)]
    pub transport: TransportKind,

    /// TCP bind address
    #[serde(default = "default_tcp_host")]
    pub tcp_host: String,

    /// TCP bind port
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Serial device (`COM4`, `/dev/ttyUSB0`)
    #[serde(default)]
    pub serial_port: Option<String>,

    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Frame file name prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Read size per transport call
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

fn default_tcp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tcp_port() -> u16 {
    9200
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_file_prefix() -> String {
    "advia".to_string()
}

fn default_read_chunk_size() -> usize {
    1024
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            tcp_host: default_tcp_host(),
            tcp_port: default_tcp_port(),
            serial_port: None,
            baud_rate: default_baud_rate(),
            file_prefix: default_file_prefix(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

impl ListenerConfig {
    /// `host:port` or serial device, for logs and errors
    pub fn endpoint(&self) -> String {
        match self.transport {
            TransportKind::Tcp => format!("{}:{}", self.tcp_host, self.tcp_port),
            TransportKind::Serial => format!(
                "{}@{}",
                self.serial_port.as_deref().unwrap_or("<unset>"),
                self.baud_rate
            ),
        }
    }
}

/// Working directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Primary queue the orchestrator drains
    pub input: PathBuf,

    /// Archive for fully delivered frames
    pub processed: PathBuf,

    /// Fallback listener output
    pub backup: PathBuf,

    /// Archive for relayed backup frames
    pub backup_processed: PathBuf,
}

impl DirectoryConfig {
    /// Destination directory for a listener role
    pub fn listener_target(&self, role: ListenerRole) -> &Path {
        match role {
            ListenerRole::Primary => &self.input,
            ListenerRole::Backup => &self.backup,
        }
    }

    /// All directories with their config field names
    pub fn named(&self) -> [(&'static str, &Path); 4] {
        [
            ("directories.input", &self.input),
            ("directories.processed", &self.processed),
            ("directories.backup", &self.backup),
            ("directories.backup_processed", &self.backup_processed),
        ]
    }
}

/// Backend delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Base URL; the tenant path segment is appended
    #[serde(default = "default_endpoint_base")]
    pub endpoint_base: String,

    /// Full endpoint URL, overrides `endpoint_base` + tenant
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Logged-in user (`name@TENANT`)
    #[serde(default)]
    pub user_name: Option<String>,

    /// Static bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable holding the bearer token
    #[serde(default)]
    pub token_env: Option<String>,

    /// File holding the bearer token (written by the session manager)
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Request timeout in seconds (0 = none)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint_base() -> String {
    "https://crm.atomwalk.com/lab_api/process_glp_test_data".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint_base: default_endpoint_base(),
            endpoint: None,
            user_name: None,
            token: None,
            token_env: None,
            token_file: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DeliveryConfig {
    /// Tenant database name: the part of the user name after the last `@`
    pub fn tenant(&self) -> &str {
        self.user_name
            .as_deref()
            .and_then(|user| user.rsplit_once('@'))
            .map(|(_, tenant)| tenant)
            .filter(|tenant| !tenant.is_empty())
            .unwrap_or(DEFAULT_TENANT)
    }

    /// Endpoint the payloads are POSTed to
    pub fn resolved_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "{}/{}/",
                self.endpoint_base.trim_end_matches('/'),
                self.tenant()
            ),
        }
    }
}

/// Record mapping constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default = "default_one")]
    pub test_type_id: u32,

    #[serde(default = "default_one")]
    pub group_id: u32,

    #[serde(default)]
    pub call_mode: CallMode,

    /// Correlating record id sent with `UPDATE_TEST`
    #[serde(default)]
    pub test_id: Option<String>,

    /// Extra or overriding test-code → display-name translations
    #[serde(default)]
    pub test_names: BTreeMap<String, String>,
}

fn default_one() -> u32 {
    1
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            test_type_id: 1,
            group_id: 1,
            call_mode: CallMode::default(),
            test_id: None,
            test_names: BTreeMap::new(),
        }
    }
}

/// Status log output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines file; `None` keeps records in the tracing output only
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Work-queue locking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Age after which a pass lock left by a crashed run is broken
    #[serde(default = "default_stale_lock_secs")]
    pub stale_lock_secs: u64,
}

fn default_stale_lock_secs() -> u64 {
    600
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            stale_lock_secs: default_stale_lock_secs(),
        }
    }
}
