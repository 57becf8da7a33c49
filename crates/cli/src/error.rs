//! Error types for CLI operations.

use contracts::ContractError;
use ingestion::IngestionError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Another pass holds the work-queue lock
    #[error("Another pass is running: {message}")]
    PassLocked { message: String },

    /// Queue, store or relay failure
    #[error(transparent)]
    Ingestion(IngestionError),

    /// Configuration or filesystem failure
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

impl From<IngestionError> for CliError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::QueueLocked { .. } => Self::PassLocked {
                message: err.to_string(),
            },
            other => Self::Ingestion(other),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
