// ==========================================
// Excel 导入系统 - 通用实体存储 Trait
// ==========================================
// 职责: 定义导入引擎所需的记录读写接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{FieldValue, RecordDraft};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 已存储的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub kind: String,
    pub key: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl StoredRecord {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }
}

/// 分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

// ==========================================
// EntityStore Trait
// ==========================================
// 用途: 导入目标记录的读写 + 运行级事务边界
// 实现者: SqliteEntityStore（使用 rusqlite）
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ===== 事务边界 =====

    /// 开启运行级事务（已在事务中则不做任何事）
    async fn begin(&self) -> RepositoryResult<()>;

    /// 提交本次运行的全部写入
    async fn commit(&self) -> RepositoryResult<()>;

    /// 回滚本次运行的全部写入（不在事务中时为空操作）
    async fn rollback(&self) -> RepositoryResult<()>;

    // ===== 读取 =====

    /// 记录是否存在
    async fn exists(&self, kind: &str, key: &str) -> RepositoryResult<bool>;

    /// 读取记录
    ///
    /// # 返回
    /// - Err(NotFound): 记录不存在
    async fn get(&self, kind: &str, key: &str) -> RepositoryResult<StoredRecord>;

    /// 按字段值查找记录，返回第一条匹配记录的 key
    async fn find_by_field(
        &self,
        kind: &str,
        field: &str,
        value: &FieldValue,
    ) -> RepositoryResult<Option<String>>;

    // ===== 写入 =====

    /// 由草稿创建新记录，返回新记录 key
    async fn create(&self, draft: &RecordDraft) -> RepositoryResult<String>;

    /// 局部更新：草稿中的字段覆盖原值，草稿中没有的字段保持不变
    async fn update(&self, key: &str, draft: &RecordDraft) -> RepositoryResult<()>;
}

// ==========================================
// EntityTypeCatalog Trait
// ==========================================
// 用途: 可导入实体类型的登记与检索
#[async_trait]
pub trait EntityTypeCatalog: Send + Sync {
    /// 登记实体类型（已存在则更新子表标记）
    async fn register_entity_type(&self, name: &str, is_child: bool) -> RepositoryResult<()>;

    /// 列出可导入的实体类型
    ///
    /// # 规则
    /// - 排除映射定义自身的类型与子表类型
    /// - search 非空时按子串过滤（不区分大小写）
    /// - 按名称排序后分页
    async fn list_entity_types(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> RepositoryResult<Vec<String>>;
}
