// ==========================================
// Excel 导入系统 - 字段映射 Repository Trait
// ==========================================
// 职责: 定义映射文档的数据访问接口（不包含业务逻辑）
// 说明: 对导入引擎而言映射文档只读；save_mapping 供配置端与测试使用
// ==========================================

use crate::domain::MappingDocument;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// FieldMappingRepository Trait
// ==========================================
// 实现者: SqliteFieldMappingRepository
#[async_trait]
pub trait FieldMappingRepository: Send + Sync {
    /// 指定实体类型是否存在映射文档
    async fn mapping_exists(&self, entity_type: &str) -> RepositoryResult<bool>;

    /// 读取映射文档（子行按 idx 排序）
    ///
    /// # 返回
    /// - Err(NotFound): 映射文档不存在
    async fn load_mapping(&self, entity_type: &str) -> RepositoryResult<MappingDocument>;

    /// 保存映射文档（整体替换子行）
    async fn save_mapping(&self, document: &MappingDocument) -> RepositoryResult<()>;
}
