// Core data models for the watermark URL tool

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::ProcessError;

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Null,
}

impl CellValue {
    /// Build a cell from raw CSV text; empty text is treated as missing
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Null
        } else {
            Self::Text(raw.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{}", number),
            Self::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One table row, in column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub cells: Vec<CellValue>,
}

impl Record {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at `index`, or `Null` when the row is shorter than the header
    pub fn get(&self, index: usize) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.cells.get(index).unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<CellValue> for Record {
    fn from_iter<T: IntoIterator<Item = CellValue>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Column names of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(pub Vec<String>);

impl Headers {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|header| header == name)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

/// Columns chosen to drive the watermark text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    /// Index of the timestamp column
    pub time_index: usize,

    /// Index of the address column
    pub watermark_index: usize,
}

impl ColumnSelection {
    /// Resolve column names against the header row
    pub fn resolve(
        headers: &Headers,
        time_column: &str,
        watermark_column: &str,
    ) -> Result<Self, ProcessError> {
        let time_index = headers
            .position(time_column)
            .ok_or_else(|| ProcessError::ColumnNotFound(time_column.to_string()))?;
        let watermark_index = headers
            .position(watermark_column)
            .ok_or_else(|| ProcessError::ColumnNotFound(watermark_column.to_string()))?;

        Ok(Self {
            time_index,
            watermark_index,
        })
    }
}

/// Status level for messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusLevel {
    /// 处理正常完成
    Info,
    /// 输入不完整，未开始处理
    Warning,
    /// 处理失败
    Error,
}

/// Error codes for batch results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 正常完成
    ProcessOk,

    // 选项错误 (WARNING)
    SelectionMissing,
    ColumnNotFound,

    // 输入错误 (ERROR)
    UnsupportedFormat,
    ReadError,

    // 输出错误 (ERROR)
    WriteError,
}

/// Outcome of a batch, reported to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Status level (INFO/WARNING/ERROR)
    pub level: StatusLevel,

    /// Result code
    pub code: ErrorCode,

    /// Human-readable status line
    pub message: String,

    /// Optional additional context (e.g., output path, row counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl ProcessResult {
    pub fn success(message: String, context: Option<serde_json::Value>) -> Self {
        Self {
            level: StatusLevel::Info,
            code: ErrorCode::ProcessOk,
            message,
            context,
        }
    }

    pub fn error(
        level: StatusLevel,
        code: ErrorCode,
        message: String,
        context: Option<serde_json::Value>,
    ) -> Self {
        Self {
            level,
            code,
            message,
            context,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::ProcessOk
    }
}
