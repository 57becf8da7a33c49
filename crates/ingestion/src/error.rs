//! Ingestion 错误类型

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 传输层失败 (bind / accept / open / read)
    #[error("transport error on {endpoint}: {message}")]
    Transport {
        /// `host:port` 或串口设备
        endpoint: String,
        /// 错误消息
        message: String,
    },

    /// 文件系统操作失败
    #[error("filesystem error on '{}': {source}", path.display())]
    FileSystem {
        /// 出错的路径
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 连续生成的文件名均已存在
    #[error("no free frame file name in '{}' after {attempts} attempts", dir.display())]
    NameExhausted {
        /// 目标目录
        dir: PathBuf,
        /// 尝试次数
        attempts: usize,
    },

    /// 另一个处理轮次持有目录锁
    #[error("work queue is locked by another pass: '{}'", path.display())]
    QueueLocked {
        /// 锁文件路径
        path: PathBuf,
    },
}

impl IngestionError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Transport { endpoint, message } => {
                ContractError::Transport { endpoint, message }
            }
            IngestionError::FileSystem { path, source } => ContractError::FileSystem { path, source },
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
