//! 配置校验模块
//!
//! 校验规则：
//! - 四个工作目录非空且互不相同
//! - tcp_port > 0, baud_rate > 0
//! - serial 传输必须指定 serial_port
//! - file_prefix 可安全用作文件名
//! - endpoint 必须是 http(s) URL
//! - token / token_env / token_file 至多一个

use std::collections::HashSet;

use contracts::{ContractError, InterfaceBlueprint, TransportKind};

/// 校验 InterfaceBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &InterfaceBlueprint) -> Result<(), ContractError> {
    validate_directories(blueprint)?;
    validate_listener(blueprint)?;
    validate_delivery(blueprint)?;
    Ok(())
}

/// 校验目录配置
fn validate_directories(blueprint: &InterfaceBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (field, path) in blueprint.directories.named() {
        if path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                field,
                "directory cannot be empty",
            ));
        }
        if !seen.insert(path) {
            return Err(ContractError::config_validation(
                field,
                format!("directories must be distinct, '{}' is used twice", path.display()),
            ));
        }
    }
    Ok(())
}

/// 校验监听器配置
fn validate_listener(blueprint: &InterfaceBlueprint) -> Result<(), ContractError> {
    let listener = &blueprint.listener;

    match listener.transport {
        TransportKind::Tcp => {
            if listener.tcp_port == 0 {
                return Err(ContractError::config_validation(
                    "listener.tcp_port",
                    "tcp_port must be > 0",
                ));
            }
        }
        TransportKind::Serial => {
            let unset = listener
                .serial_port
                .as_deref()
                .map_or(true, |port| port.trim().is_empty());
            if unset {
                return Err(ContractError::config_validation(
                    "listener.serial_port",
                    "serial transport requires serial_port",
                ));
            }
        }
    }

    if listener.baud_rate == 0 {
        return Err(ContractError::config_validation(
            "listener.baud_rate",
            "baud_rate must be > 0",
        ));
    }

    if listener.read_chunk_size == 0 {
        return Err(ContractError::config_validation(
            "listener.read_chunk_size",
            "read_chunk_size must be > 0",
        ));
    }

    let prefix_ok = !listener.file_prefix.is_empty()
        && listener
            .file_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !prefix_ok {
        return Err(ContractError::config_validation(
            "listener.file_prefix",
            format!(
                "file_prefix must be non-empty [A-Za-z0-9_-], got '{}'",
                listener.file_prefix
            ),
        ));
    }

    Ok(())
}

/// 校验投递配置
fn validate_delivery(blueprint: &InterfaceBlueprint) -> Result<(), ContractError> {
    let delivery = &blueprint.delivery;

    let (field, url) = match &delivery.endpoint {
        Some(endpoint) => ("delivery.endpoint", endpoint.as_str()),
        None => ("delivery.endpoint_base", delivery.endpoint_base.as_str()),
    };
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ContractError::config_validation(
            field,
            format!("expected an http(s) URL, got '{url}'"),
        ));
    }

    let sources = [
        delivery.token.is_some(),
        delivery.token_env.is_some(),
        delivery.token_file.is_some(),
    ];
    if sources.iter().filter(|set| **set).count() > 1 {
        return Err(ContractError::config_validation(
            "delivery.token",
            "set at most one of token, token_env, token_file",
        ));
    }

    Ok(())
}
