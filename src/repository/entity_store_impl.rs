// ==========================================
// Excel 导入系统 - 通用实体存储实现
// ==========================================
// 职责: 实现 EntityStore / EntityTypeCatalog（使用 rusqlite）
// 存储: record 表（data 列为 JSON），entity_type 表
// 说明: 每个实例独占一个连接，一次导入运行对应一个实例，
//       从而每次运行各自持有自己的事务
// ==========================================

use crate::db::{open_import_connection, MAPPING_CHILD_DOC_TYPE, MAPPING_DOC_TYPE};
use crate::domain::{FieldValue, RecordDraft, DATETIME_FORMAT};
use crate::repository::entity_store::{EntityStore, EntityTypeCatalog, Pagination, StoredRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

// 字段值绑定为 SQL 参数（与 json_extract 的返回类型对齐）
impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Text(v) => ToSqlOutput::from(v.as_str()),
            FieldValue::Integer(v) => ToSqlOutput::from(*v),
            FieldValue::Float(v) => ToSqlOutput::from(*v),
            // json_extract 对 true/false 返回 1/0
            FieldValue::Boolean(v) => ToSqlOutput::from(*v as i64),
            FieldValue::DateTime(v) => ToSqlOutput::from(v.format(DATETIME_FORMAT).to_string()),
        })
    }
}

/// 构造 json_extract 路径，字段名整体加引号
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// LIKE 模式转义（ESCAPE '\'）
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// ==========================================
// SqliteEntityStore
// ==========================================
pub struct SqliteEntityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntityStore {
    /// 打开独立连接
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_import_connection(db_path)?;
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
impl EntityStore for SqliteEntityStore {
    async fn begin(&self) -> RepositoryResult<()> {
        // IMMEDIATE: 开启时即取写锁，与其他运行的争用在此按 busy_timeout 等待，
        // 而不是在首次写入时升级失败。等待期间不占用异步工作线程
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            if conn.is_autocommit() {
                conn.execute_batch("BEGIN IMMEDIATE")
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                debug!("运行级事务已开启");
            }
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::InternalError(e.to_string()))?
    }

    async fn commit(&self) -> RepositoryResult<()> {
        let conn = self.lock()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            debug!("运行级事务已提交");
        }
        Ok(())
    }

    async fn rollback(&self) -> RepositoryResult<()> {
        let conn = self.lock()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            debug!("运行级事务已回滚");
        }
        Ok(())
    }

    async fn exists(&self, kind: &str, key: &str) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM record WHERE kind = ?1 AND record_key = ?2",
                params![kind, key],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    async fn get(&self, kind: &str, key: &str) -> RepositoryResult<StoredRecord> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM record WHERE kind = ?1 AND record_key = ?2",
                params![kind, key],
                |row| row.get(0),
            )
            .optional()?;

        let raw = raw.ok_or_else(|| RepositoryError::NotFound {
            entity: kind.to_string(),
            id: key.to_string(),
        })?;

        Ok(StoredRecord {
            kind: kind.to_string(),
            key: key.to_string(),
            data: serde_json::from_str(&raw)?,
        })
    }

    async fn find_by_field(
        &self,
        kind: &str,
        field: &str,
        value: &FieldValue,
    ) -> RepositoryResult<Option<String>> {
        let conn = self.lock()?;
        let key = conn
            .query_row(
                r#"
                SELECT record_key FROM record
                WHERE kind = ?1 AND json_extract(data, ?2) = ?3
                ORDER BY created_at, record_key
                LIMIT 1
                "#,
                params![kind, json_path(field), value],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(key)
    }

    async fn create(&self, draft: &RecordDraft) -> RepositoryResult<String> {
        let key = Uuid::new_v4().to_string();
        let data = serde_json::to_string(&draft.to_json_map())?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO record (kind, record_key, data) VALUES (?1, ?2, ?3)",
            params![draft.entity_type, key, data],
        )?;

        Ok(key)
    }

    async fn update(&self, key: &str, draft: &RecordDraft) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM record WHERE kind = ?1 AND record_key = ?2",
                params![draft.entity_type, key],
                |row| row.get(0),
            )
            .optional()?;

        let raw = raw.ok_or_else(|| RepositoryError::NotFound {
            entity: draft.entity_type.clone(),
            id: key.to_string(),
        })?;

        let mut data: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)?;
        for (field, value) in &draft.fields {
            data.insert(field.clone(), value.to_json());
        }

        conn.execute(
            r#"
            UPDATE record SET data = ?1, updated_at = datetime('now')
            WHERE kind = ?2 AND record_key = ?3
            "#,
            params![serde_json::to_string(&data)?, draft.entity_type, key],
        )?;

        Ok(())
    }
}

#[async_trait]
impl EntityTypeCatalog for SqliteEntityStore {
    async fn register_entity_type(&self, name: &str, is_child: bool) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO entity_type (name, is_child) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET is_child = ?2
            "#,
            params![name, is_child as i32],
        )?;
        Ok(())
    }

    async fn list_entity_types(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> RepositoryResult<Vec<String>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT name FROM entity_type
            WHERE is_child = 0
              AND name NOT IN (?1, ?2)
              AND (?3 IS NULL OR name LIKE ?3 ESCAPE '\')
            ORDER BY name
            LIMIT ?4 OFFSET ?5
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                MAPPING_DOC_TYPE,
                MAPPING_CHILD_DOC_TYPE,
                pattern,
                page.limit as i64,
                page.offset as i64,
            ],
            |row| row.get::<_, String>(0),
        )?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }
}
