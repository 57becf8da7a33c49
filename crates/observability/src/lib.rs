//! # Observability
//!
//! 可观测性模块：Prometheus 指标 + 状态审计日志。
//!
//! ## 功能
//!
//! - Prometheus 指标导出 (长期运行的 `listen` 命令)
//! - 处理轮次指标
//! - `AuditLog` 实现 (JSON-lines 文件 / tracing / 内存)
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{audit_log, metrics};
//!
//! observability::init_metrics_only(9000)?;
//! let audit = audit_log(&blueprint.audit)?;
//!
//! let report = pipeline.run_pass().await?;
//! metrics::record_pass(report.outcome, report.files.len(), report.duration);
//! ```

pub mod audit;
pub mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{AuditConfig, AuditLog, ContractError};
use metrics_exporter_prometheus::PrometheusBuilder;

// Re-exports
pub use crate::audit::{JsonlAuditLog, MemoryAuditLog, TracingAuditLog};
pub use crate::metrics::{describe_metrics, record_file_outcome, record_pass};

/// 初始化 Prometheus 指标导出
///
/// Tracing 由 CLI 自行初始化，这里只安装指标 recorder。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;
    describe_metrics();

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// 按 `[audit]` 配置构建状态日志
///
/// 配置了 `path` 时写 JSON-lines 文件，否则只输出到 tracing。
pub fn audit_log(config: &AuditConfig) -> Result<Arc<dyn AuditLog>, ContractError> {
    match &config.path {
        Some(path) => Ok(Arc::new(JsonlAuditLog::open(path)?)),
        None => Ok(Arc::new(TracingAuditLog)),
    }
}
