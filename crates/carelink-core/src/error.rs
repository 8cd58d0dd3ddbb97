//! 错误定义模块

use thiserror::Error;

/// Carelink系统统一错误类型
#[derive(Error, Debug)]
pub enum CarelinkError {
    #[error("验证错误: {0}")]
    Validation(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("对象存储错误: {0}")]
    Storage(String),

    #[error("推理服务错误: {0}")]
    Inference(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// Carelink系统统一结果类型
pub type Result<T> = std::result::Result<T, CarelinkError>;
