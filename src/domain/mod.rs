// ==========================================
// Excel 导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域对象与基础类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod import;
pub mod mapping;
pub mod types;

// 重导出核心类型
pub use import::{
    progress_percent, ImportRow, ImportRun, PreviewOutcome, PreviewReport, ProgressEvent,
    RecordDraft, RowOutcome, SheetData,
};
pub use mapping::{FieldMapping, MappingDocument};
pub use types::{FieldValue, QueueClass, RunStatus, DATETIME_FORMAT};
