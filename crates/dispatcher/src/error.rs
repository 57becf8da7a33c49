//! Dispatcher error types

use std::path::PathBuf;

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// HTTP client could not be built
    #[error("failed to create http client for '{endpoint}': {message}")]
    ClientBuild { endpoint: String, message: String },

    /// Token environment variable unset or not unicode
    #[error("token variable '{name}' is not set")]
    TokenEnvMissing { name: String },

    /// Token file unreadable
    #[error("cannot read token file '{}': {source}", path.display())]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from contract
    #[error("delivery error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a client build error
    pub fn client_build(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::ClientBuild {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

impl From<DispatcherError> for contracts::ContractError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::Contract(inner) => inner,
            other => contracts::ContractError::Other(other.to_string()),
        }
    }
}
