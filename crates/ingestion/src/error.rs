//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 回放文件无法读取
    #[error("cannot read replay file '{path}': {source}")]
    ReplayOpen {
        /// 文件路径
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 缺少必需参数
    #[error("stream source '{source_name}' requires parameter '{param}'")]
    MissingParam {
        /// 事件源名称
        source_name: String,
        /// 参数名
        param: &'static str,
    },

    /// 载荷解码失败
    #[error("payload decode failed at '{path}': {message}")]
    Decode {
        /// 字段路径 (整体失败时为空)
        path: String,
        /// 错误消息
        message: String,
    },
}

impl IngestionError {
    /// 创建解码错误
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Decode { .. } => ContractError::decode(err.to_string()),
            IngestionError::ReplayOpen { .. } => ContractError::stream("replay_file", err.to_string()),
            IngestionError::MissingParam { ref source_name, .. } => {
                ContractError::config_validation(format!("stream.params ({})", source_name), err.to_string())
            }
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
