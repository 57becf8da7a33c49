//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, InterfaceBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<InterfaceBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<InterfaceBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<InterfaceBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CallMode, TransportKind};

    #[test]
    fn test_parse_toml_defaults() {
        let content = r#"
[directories]
input = "in"
processed = "processed"
backup = "backup"
backup_processed = "backup_processed"
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.listener.transport, TransportKind::Tcp);
        assert_eq!(bp.listener.tcp_port, 9200);
        assert_eq!(bp.delivery.timeout_secs, 30);
        assert_eq!(bp.mapping.call_mode, CallMode::AddTest);
        assert_eq!(bp.queue.stale_lock_secs, 600);
        assert!(bp.audit.path.is_none());
    }

    #[test]
    fn test_parse_json_serial_listener() {
        let content = r#"{
            "listener": { "transport": "serial", "serial_port": "COM4", "baud_rate": 19200 },
            "directories": {
                "input": "in", "processed": "done",
                "backup": "bk", "backup_processed": "bk_done"
            },
            "mapping": { "call_mode": "UPDATE_TEST", "test_id": "GLP-1" }
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.listener.transport, TransportKind::Serial);
        assert_eq!(bp.listener.serial_port.as_deref(), Some("COM4"));
        assert_eq!(bp.mapping.call_mode, CallMode::UpdateTest);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_directories_section() {
        assert!(parse_toml("[listener]\ntcp_port = 1\n").is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("JSON"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
