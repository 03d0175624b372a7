// ==========================================
// Excel 导入系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把导入层/仓储层错误转换为面向调用方的错误
// 每个错误带稳定的错误码，供前端或命令行判定
// ==========================================

use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("文件格式不支持: {0}")]
    InvalidFormat(String),

    #[error("字段映射未配置: {0}")]
    MappingNotFound(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("任务调度失败: {0}")]
    SchedulingError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidFormat(_) => "INVALID_FORMAT",
            ApiError::MappingNotFound(_) => "MAPPING_NOT_FOUND",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::SchedulingError(_) => "SCHEDULING_ERROR",
            ApiError::DatabaseError(_) | ApiError::DatabaseTransactionError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::SerializationError(msg) => ApiError::InternalError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::StorageError(msg) => ApiError::ImportError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::InvalidArgument(msg) => ApiError::InvalidInput(msg),
            ImportError::FileNotFound(reference) => {
                ApiError::NotFound(format!("文件不存在: {}", reference))
            }
            ImportError::InvalidFormat(path) => ApiError::InvalidFormat(path),
            ImportError::MappingNotFound(entity) => ApiError::MappingNotFound(entity),
            ImportError::SchedulingError(msg) => ApiError::SchedulingError(msg),
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(e) => ApiError::Other(e),
            other @ (ImportError::FileReadError(_)
            | ImportError::ExcelParseError(_)
            | ImportError::RecordError { .. }
            | ImportError::ImportFailure(_)) => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "excel_field_mapping".to_string(),
            id: "Contact".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match &api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("excel_field_mapping"));
                assert!(msg.contains("Contact"));
            }
            _ => panic!("Expected NotFound"),
        }
        assert_eq!(api_err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_import_error_codes() {
        let cases: Vec<(ImportError, &str)> = vec![
            (ImportError::InvalidArgument("x".into()), "INVALID_INPUT"),
            (ImportError::FileNotFound("a.xlsx".into()), "NOT_FOUND"),
            (ImportError::InvalidFormat("a.csv".into()), "INVALID_FORMAT"),
            (ImportError::MappingNotFound("Contact".into()), "MAPPING_NOT_FOUND"),
            (ImportError::ExcelParseError("bad".into()), "IMPORT_ERROR"),
            (
                ImportError::Repository(RepositoryError::DatabaseQueryError("q".into())),
                "DATABASE_ERROR",
            ),
        ];

        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code(), code);
        }
    }
}
