// Cell routing rules and column selection checks

use crate::models::{ErrorCode, Headers, StatusLevel};

/// Keywords marking a timestamp column ("time")
pub const TIME_COLUMN_KEYWORDS: &[&str] = &["时间"];

/// Keywords marking an address column ("watermark", "address")
pub const WATERMARK_COLUMN_KEYWORDS: &[&str] = &["水印", "地址"];

/// Column selection errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("请确保所有选项都已选择")]
    SelectionMissing,

    #[error("找不到列: {0}")]
    ColumnNotFound(String),
}

impl ProcessError {
    /// Convert to ErrorCode
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            ProcessError::SelectionMissing => ErrorCode::SelectionMissing,
            ProcessError::ColumnNotFound(_) => ErrorCode::ColumnNotFound,
        }
    }

    pub fn status_level(&self) -> StatusLevel {
        StatusLevel::Warning
    }

    /// Get context for error (e.g., the missing column)
    pub fn context(&self) -> Option<serde_json::Value> {
        match self {
            ProcessError::ColumnNotFound(column) => Some(serde_json::json!({ "column": column })),
            _ => None,
        }
    }
}

/// Whether a text cell should be rewritten
///
/// # Rules
/// - The value contains `//`
/// - The lowercased value ends with `.jpg`
///
/// The check runs on the whole cell, including anything after a `;`.
pub fn is_image_url(value: &str) -> bool {
    value.contains("//") && value.to_lowercase().ends_with(".jpg")
}

/// The URL part of a cell: everything before the first `;`
pub fn extract_url(value: &str) -> &str {
    value.split(';').next().unwrap_or(value)
}

/// First header containing any of `keywords`
fn detect_column<'a>(headers: &'a Headers, keywords: &[&str]) -> Option<&'a str> {
    headers
        .names()
        .iter()
        .find(|name| keywords.iter().any(|keyword| name.contains(keyword)))
        .map(String::as_str)
}

/// Guess the timestamp column
pub fn detect_time_column(headers: &Headers) -> Option<&str> {
    detect_column(headers, TIME_COLUMN_KEYWORDS)
}

/// Guess the address column
pub fn detect_watermark_column(headers: &Headers) -> Option<&str> {
    detect_column(headers, WATERMARK_COLUMN_KEYWORDS)
}
