// ==========================================
// Excel 导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::i18n::translate;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 参数错误 =====
    #[error("参数无效: {0}")]
    InvalidArgument(String),

    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls）")]
    InvalidFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    // ===== 映射错误 =====
    #[error("未找到字段映射: {0}")]
    MappingNotFound(String),

    // ===== 行级错误 =====
    #[error("行 {row} 处理失败: {message}")]
    RecordError { row: usize, message: String },

    // ===== 运行级错误 =====
    #[error("导入失败: {0}")]
    ImportFailure(String),

    #[error("任务调度失败: {0}")]
    SchedulingError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 面向用户的失败原因（按语言本地化）
    ///
    /// 运行级失败写入完成事件，错误详情保持原文
    pub fn failure_reason(&self, locale: &str) -> String {
        let (key, detail) = match self {
            ImportError::FileNotFound(d) | ImportError::FileReadError(d) => {
                ("import.error.file_read", d.clone())
            }
            ImportError::InvalidFormat(d) | ImportError::ExcelParseError(d) => {
                ("import.error.excel_parse", d.clone())
            }
            ImportError::Repository(e) => ("import.error.database", e.detail()),
            ImportError::InvalidArgument(d)
            | ImportError::MappingNotFound(d)
            | ImportError::ImportFailure(d)
            | ImportError::SchedulingError(d)
            | ImportError::InternalError(d) => ("import.error.internal", d.clone()),
            ImportError::RecordError { row, message } => {
                ("import.error.internal", format!("row {row}: {message}"))
            }
            ImportError::Other(e) => ("import.error.internal", e.to_string()),
        };
        translate(locale, key, &[("detail", detail.as_str())])
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
