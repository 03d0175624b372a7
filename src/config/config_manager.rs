// ==========================================
// Excel 导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::{ConfigResult, ImportConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::QueueClass;
use crate::i18n;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析配置值；无法解析时告警并使用默认值
    fn parse_or_default<T: FromStr>(&self, key: &str, default: T) -> ConfigResult<T> {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(value) => Ok(value),
                Err(_) => {
                    warn!(key, value = %raw, "配置值无法解析，使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    // ===== 后台调度 =====

    async fn get_import_queue(&self) -> ConfigResult<QueueClass> {
        let value = self.get_config_or_default(config_keys::IMPORT_QUEUE, "long")?;
        Ok(QueueClass::parse(&value).unwrap_or_else(|| {
            warn!(value = %value, "未知队列，使用 long");
            QueueClass::Long
        }))
    }

    async fn get_import_timeout_secs(&self) -> ConfigResult<u64> {
        let secs = self.parse_or_default(config_keys::IMPORT_TIMEOUT_SECS, 3000u64)?;
        Ok(if secs == 0 { 3000 } else { secs })
    }

    async fn get_long_queue_workers(&self) -> ConfigResult<usize> {
        let workers = self.parse_or_default(config_keys::LONG_QUEUE_WORKERS, 2usize)?;
        Ok(workers.max(1))
    }

    // ===== 进度事件 =====

    async fn get_progress_interval(&self) -> ConfigResult<usize> {
        let interval = self.parse_or_default(config_keys::PROGRESS_INTERVAL, 10usize)?;
        Ok(interval.max(1))
    }

    async fn get_progress_topic(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::PROGRESS_TOPIC, "excel_import_progress")
    }

    async fn get_locale(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::LOCALE, i18n::DEFAULT_LOCALE)?;
        if i18n::is_supported(&value) {
            Ok(value)
        } else {
            warn!(value = %value, "不支持的语言，使用默认语言");
            Ok(i18n::DEFAULT_LOCALE.to_string())
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 后台调度
    pub const IMPORT_QUEUE: &str = "import_queue";
    pub const IMPORT_TIMEOUT_SECS: &str = "import_timeout_secs";
    pub const LONG_QUEUE_WORKERS: &str = "long_queue_workers";

    // 进度事件
    pub const PROGRESS_INTERVAL: &str = "progress_interval";
    pub const PROGRESS_TOPIC: &str = "progress_topic";

    // 消息语言
    pub const LOCALE: &str = "locale";
}
