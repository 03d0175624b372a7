// ==========================================
// Excel 导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + calamine
// 系统定位: Excel 表格按字段映射导入通用记录存储
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 文件定位、预检、导入引擎
pub mod importer;

// 服务层 - 事件通道与任务调度
pub mod services;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    FieldMapping, FieldValue, ImportRun, MappingDocument, PreviewOutcome, PreviewReport,
    ProgressEvent, QueueClass, RecordDraft, RunStatus,
};

// 导入层
pub use importer::{FileResolver, ImportEngine, ImportError, ImportJob, PreviewValidator};

// API
pub use api::{ApiError, ImportApi, StartImportResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Excel 导入系统";
