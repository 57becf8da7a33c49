//! # ASTM Bridge
//!
//! 单轮处理编排库，供 `astm-bridge` 二进制与集成测试共用。
//!
//! 一轮处理：获取队列锁 → 备份转移 → 认领 → 解析 → 映射 → 投递 → 归档。

pub mod error;
pub mod pipeline;

pub use error::{CliError, Result};
pub use pipeline::{PassReport, Pipeline};
