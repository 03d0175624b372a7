// ==========================================
// Excel 导入系统 - 导入层
// ==========================================
// 职责: 文件定位、表头预检、逐行导入
// 支持: Excel (.xlsx/.xls)
// ==========================================

// 模块声明
pub mod conflict_handler;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod file_resolver;
pub mod import_engine;
pub mod mapping_provider;
pub mod preview_validator;

// 重导出核心类型
pub use conflict_handler::{decide, RowAction};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{normalize_cell, FieldMapper};
pub use file_resolver::FileResolver;
pub use import_engine::{ImportEngine, ImportJob, DEFAULT_PROGRESS_INTERVAL};
pub use mapping_provider::MappingProvider;
pub use preview_validator::{compare_headers, PreviewValidator};
