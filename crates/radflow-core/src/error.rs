//! 错误定义模块

use thiserror::Error;

/// 流水线统一错误类型
#[derive(Error, Debug)]
pub enum RadflowError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("DICOM处理错误: {0}")]
    Dicom(String),

    #[error("DICOM解析错误: {0}")]
    DicomParseError(String),

    #[error("图像处理错误: {0}")]
    Image(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("检测错误: {0}")]
    Detection(String),

    #[error("报告生成错误: {0}")]
    Report(String),

    #[error("操作超时: {0}")]
    Timeout(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("系统内部错误: {0}")]
    Internal(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },
}

/// 流水线统一结果类型
pub type Result<T> = std::result::Result<T, RadflowError>;
