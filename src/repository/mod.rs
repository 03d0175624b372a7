// ==========================================
// Excel 导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod blob_store;
pub mod entity_store;
pub mod entity_store_impl;
pub mod error;
pub mod mapping_repo;
pub mod mapping_repo_impl;

// 重导出核心仓储
pub use blob_store::{BlobStore, LocalBlobStore};
pub use entity_store::{EntityStore, EntityTypeCatalog, Pagination, StoredRecord};
pub use entity_store_impl::SqliteEntityStore;
pub use error::{RepositoryError, RepositoryResult};
pub use mapping_repo::FieldMappingRepository;
pub use mapping_repo_impl::SqliteFieldMappingRepository;
