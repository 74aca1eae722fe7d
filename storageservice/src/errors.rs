// Storage errors

use std::path::PathBuf;

use watermark_url_core::{ErrorCode, ProcessError, StatusLevel};

/// Errors raised while reading input rows or writing results
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("不支持的文件格式: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("读取数据文件失败: {0}")]
    Read(#[source] csv::Error),

    #[error("写入结果文件失败: {0}")]
    Write(#[source] csv::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Selection(#[from] ProcessError),
}

impl StorageError {
    /// Convert to ErrorCode
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            StorageError::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            StorageError::Read(_) => ErrorCode::ReadError,
            StorageError::Write(_) | StorageError::Io(_) => ErrorCode::WriteError,
            StorageError::Selection(e) => e.to_error_code(),
        }
    }

    pub fn status_level(&self) -> StatusLevel {
        match self {
            StorageError::Selection(e) => e.status_level(),
            _ => StatusLevel::Error,
        }
    }

    pub fn context(&self) -> Option<serde_json::Value> {
        match self {
            StorageError::UnsupportedFormat(path) => {
                Some(serde_json::json!({ "path": path.display().to_string() }))
            }
            StorageError::Selection(e) => e.context(),
            _ => None,
        }
    }

    /// Status line shown to the user. Input problems are reported as-is,
    /// failures during the batch get the generic prefix.
    pub fn status_message(&self) -> String {
        match self {
            StorageError::UnsupportedFormat(_) | StorageError::Selection(_) => self.to_string(),
            _ => format!("处理过程中出错: {}", self),
        }
    }
}
