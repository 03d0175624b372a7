// ==========================================
// Excel 导入系统 - 文件存储 Repository
// ==========================================
// 职责: 上传文件的删除 + 文件目录（file_catalog）登记/查找/删除
// 说明: 文件路径解析由 importer::file_resolver 负责
// ==========================================

use crate::db::open_import_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// BlobStore Trait
// ==========================================
// 实现者: LocalBlobStore（本地文件系统 + SQLite 目录表）
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 删除本地文件（文件不存在视为成功）
    async fn delete(&self, path: &Path) -> RepositoryResult<()>;

    /// 按文件引用查找目录记录，返回记录名
    async fn find_catalog_entry(&self, file_url: &str) -> RepositoryResult<Option<String>>;

    /// 删除目录记录
    async fn delete_catalog_entry(&self, name: &str) -> RepositoryResult<()>;
}

// ==========================================
// LocalBlobStore
// ==========================================
pub struct LocalBlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalBlobStore {
    /// 创建新的实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（file_catalog 表所在库）
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

    /// 登记上传文件，返回目录记录名
    pub fn register_file(&self, file_url: &str) -> RepositoryResult<String> {
        let name = Uuid::new_v4().simple().to_string();
        let file_name = Path::new(file_url)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO file_catalog (name, file_url, file_name) VALUES (?1, ?2, ?3)",
            params![name, file_url, file_name],
        )?;
        Ok(name)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn delete(&self, path: &Path) -> RepositoryResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepositoryError::StorageError(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn find_catalog_entry(&self, file_url: &str) -> RepositoryResult<Option<String>> {
        let conn = self.lock()?;
        let name = conn
            .query_row(
                "SELECT name FROM file_catalog WHERE file_url = ?1",
                params![file_url],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(name)
    }

    async fn delete_catalog_entry(&self, name: &str) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM file_catalog WHERE name = ?1", params![name])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn memory_store() -> LocalBlobStore {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        LocalBlobStore::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_catalog_register_find_delete() {
        let store = memory_store();
        let name = store.register_file("/private/files/contacts.xlsx").unwrap();

        let found = store
            .find_catalog_entry("/private/files/contacts.xlsx")
            .await
            .unwrap();
        assert_eq!(found, Some(name.clone()));

        store.delete_catalog_entry(&name).await.unwrap();
        assert_eq!(
            store
                .find_catalog_entry("/private/files/contacts.xlsx")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_delete_file_and_missing_file() {
        let store = memory_store();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x").unwrap();
        let path = file.path().to_path_buf();

        store.delete(&path).await.unwrap();
        assert!(!path.exists());

        // 再次删除不报错
        store.delete(&path).await.unwrap();
    }
}
