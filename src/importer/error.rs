// ==========================================
// 行情数据导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 缺失值不是错误（Option::None），只有"存在但损坏"的数据才报错
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文本解码失败 (编码 {encoding}): {message}")]
    EncodingError { encoding: String, message: String },

    // ===== 数据转换错误 =====
    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== 配置错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_conversion_message_names_row_and_field() {
        let err = ImportError::TypeConversionError {
            row: 7,
            field: "Close".to_string(),
            message: "无法解析为浮点数: abc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("行 7"));
        assert!(msg.contains("Close"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_repository() {
        let err: ImportError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, ImportError::Repository(_)));
    }
}
