// ==========================================
// Excel 导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发导入写入时的偶发 busy 错误
// - 建表语句集中在此处（幂等）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 导入连接的 busy_timeout（毫秒）
///
/// 写锁在一次运行内一直持有，后到的运行要等前一个运行提交
pub const IMPORT_BUSY_TIMEOUT_MS: u64 = 600_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 映射定义本身所用的实体类型名（不可作为导入目标）
pub const MAPPING_DOC_TYPE: &str = "excel_field_mapping";
pub const MAPPING_CHILD_DOC_TYPE: &str = "field_mapping_child";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
/// - journal_mode=WAL 写入数据库文件，读连接不受写事务阻塞（内存库返回 memory）
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开导入运行使用的连接（记录写入与文件清理）
pub fn open_import_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    conn.busy_timeout(Duration::from_millis(IMPORT_BUSY_TIMEOUT_MS))?;
    Ok(conn)
}

/// 初始化 schema（全部 CREATE IF NOT EXISTS，可重复执行）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS entity_type (
            name TEXT PRIMARY KEY,
            module TEXT,
            is_child INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS record (
            kind TEXT NOT NULL,
            record_key TEXT NOT NULL,
            data TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (kind, record_key)
        );

        CREATE TABLE IF NOT EXISTS excel_field_mapping (
            entity_type TEXT PRIMARY KEY,
            unique_field TEXT
        );

        CREATE TABLE IF NOT EXISTS field_mapping_child (
            entity_type TEXT NOT NULL
                REFERENCES excel_field_mapping(entity_type) ON DELETE CASCADE,
            idx INTEGER NOT NULL,
            excel_field_name TEXT NOT NULL,
            target_field_name TEXT NOT NULL,
            PRIMARY KEY (entity_type, idx)
        );

        CREATE TABLE IF NOT EXISTS file_catalog (
            name TEXT PRIMARY KEY,
            file_url TEXT NOT NULL UNIQUE,
            file_name TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
