//! Bearer token sources
//!
//! The session manager owns login; the sink only reads the current token,
//! once per request, so a refreshed token is picked up without a restart.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use contracts::DeliveryConfig;

use crate::error::DispatcherError;

/// Supplies the bearer token for a delivery
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Current token, `None` when no credential is configured
    fn token(&self) -> Result<Option<String>, DispatcherError>;
}

/// No credential; requests go out without `Authorization`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenSource for NoToken {
    fn token(&self) -> Result<Option<String>, DispatcherError> {
        Ok(None)
    }
}

/// Fixed token from configuration
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Result<Option<String>, DispatcherError> {
        Ok(Some(self.0.clone()))
    }
}

/// Token read from an environment variable
#[derive(Debug, Clone)]
pub struct EnvToken {
    name: String,
}

impl EnvToken {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TokenSource for EnvToken {
    fn token(&self) -> Result<Option<String>, DispatcherError> {
        std::env::var(&self.name)
            .map(Some)
            .map_err(|_| DispatcherError::TokenEnvMissing {
                name: self.name.clone(),
            })
    }
}

/// Token read from a file written by the session manager
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenSource for TokenFile {
    fn token(&self) -> Result<Option<String>, DispatcherError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| {
            DispatcherError::TokenFile {
                path: self.path.clone(),
                source,
            }
        })?;
        let token = raw.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }
}

/// Token source selected by the delivery configuration
pub fn token_source(config: &DeliveryConfig) -> Arc<dyn TokenSource> {
    if let Some(token) = &config.token {
        Arc::new(StaticToken::new(token.clone()))
    } else if let Some(name) = &config.token_env {
        Arc::new(EnvToken::new(name.clone()))
    } else if let Some(path) = &config.token_file {
        Arc::new(TokenFile::new(path.clone()))
    } else {
        Arc::new(NoToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_static_token_is_redacted_in_debug() {
        let source = StaticToken::new("s3cret");
        assert_eq!(source.token().unwrap().as_deref(), Some("s3cret"));
        assert!(!format!("{source:?}").contains("s3cret"));
    }

    #[test]
    fn test_token_file_trimmed_and_reread() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "first\n").unwrap();

        let source = TokenFile::new(&path);
        assert_eq!(source.token().unwrap().as_deref(), Some("first"));

        std::fs::write(&path, "second").unwrap();
        assert_eq!(source.token().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_missing_token_file() {
        let source = TokenFile::new("/nonexistent/astm-bridge/token");
        assert!(matches!(
            source.token(),
            Err(DispatcherError::TokenFile { .. })
        ));
    }

    #[test]
    fn test_missing_env_variable() {
        let source = EnvToken::new("ASTM_BRIDGE_TEST_TOKEN_NEVER_SET");
        assert!(source.token().is_err());
    }

    #[test]
    fn test_selection_from_config() {
        let config = DeliveryConfig {
            token_env: Some("ERP_TOKEN".to_string()),
            ..Default::default()
        };
        assert!(format!("{:?}", token_source(&config)).contains("ERP_TOKEN"));
        assert!(token_source(&DeliveryConfig::default())
            .token()
            .unwrap()
            .is_none());
    }
}
