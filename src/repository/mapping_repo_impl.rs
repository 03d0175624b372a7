// ==========================================
// Excel 导入系统 - 字段映射 Repository 实现
// ==========================================
// 职责: 实现映射文档读写（使用 rusqlite）
// 存储: excel_field_mapping（主表）+ field_mapping_child（子行）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{FieldMapping, MappingDocument};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::mapping_repo::FieldMappingRepository;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteFieldMappingRepository
// ==========================================
pub struct SqliteFieldMappingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFieldMappingRepository {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl FieldMappingRepository for SqliteFieldMappingRepository {
    async fn mapping_exists(&self, entity_type: &str) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM excel_field_mapping WHERE entity_type = ?1",
                params![entity_type],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    async fn load_mapping(&self, entity_type: &str) -> RepositoryResult<MappingDocument> {
        let conn = self.lock()?;

        let unique_field: Option<Option<String>> = conn
            .query_row(
                "SELECT unique_field FROM excel_field_mapping WHERE entity_type = ?1",
                params![entity_type],
                |row| row.get(0),
            )
            .optional()?;

        let unique_field = unique_field.ok_or_else(|| RepositoryError::NotFound {
            entity: "excel_field_mapping".to_string(),
            id: entity_type.to_string(),
        })?;

        let mut stmt = conn.prepare(
            r#"
            SELECT excel_field_name, target_field_name
            FROM field_mapping_child
            WHERE entity_type = ?1
            ORDER BY idx
            "#,
        )?;
        let rows = stmt.query_map(params![entity_type], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut mapping = FieldMapping::new();
        for row in rows {
            let (column, field) = row?;
            mapping.insert(column, field);
        }

        Ok(MappingDocument {
            entity_type: entity_type.to_string(),
            // 空字符串视为未配置
            unique_field: unique_field.filter(|f| !f.trim().is_empty()),
            mapping,
        })
    }

    async fn save_mapping(&self, document: &MappingDocument) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            r#"
            INSERT INTO excel_field_mapping (entity_type, unique_field) VALUES (?1, ?2)
            ON CONFLICT(entity_type) DO UPDATE SET unique_field = ?2
            "#,
            params![document.entity_type, document.unique_field],
        )?;
        tx.execute(
            "DELETE FROM field_mapping_child WHERE entity_type = ?1",
            params![document.entity_type],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO field_mapping_child
                    (entity_type, idx, excel_field_name, target_field_name)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for (idx, (column, field)) in document.mapping.iter().enumerate() {
                stmt.execute(params![document.entity_type, idx as i64, column, field])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }
}
