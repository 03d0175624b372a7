// ==========================================
// Excel 导入系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ImportApi;
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::FileResolver;
use crate::services::{BroadcastEventChannel, QueueWorkers, TokioTaskRunner};

/// 应用状态
///
/// 包含API实例和共享资源（事件通道、任务调度器）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 站点目录（上传文件所在根目录）
    pub site_path: PathBuf,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 进度事件通道
    pub events: Arc<BroadcastEventChannel>,

    /// 后台任务调度器
    pub runner: Arc<TokioTaskRunner>,

    /// Excel 导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - site_path: 站点目录
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 初始化数据库 schema（幂等）
    /// 2. 读取调度配置，创建任务调度器
    /// 3. 创建API实例
    pub async fn new(db_path: String, site_path: PathBuf) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, site_path = %site_path.display(), "初始化AppState");

        {
            let conn = open_sqlite_connection(&db_path)
                .map_err(|e| format!("无法打开数据库: {}", e))?;
            init_schema(&conn).map_err(|e| format!("初始化数据库结构失败: {}", e))?;
        }

        let config = Arc::new(
            ConfigManager::new(&db_path).map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let long_workers = match config.get_long_queue_workers().await {
            Ok(workers) => workers,
            Err(e) => {
                tracing::warn!(error = %e, "读取 long 队列并发配置失败，使用默认值");
                QueueWorkers::default().long
            }
        };
        let runner = Arc::new(TokioTaskRunner::new(QueueWorkers {
            long: long_workers,
            ..QueueWorkers::default()
        }));

        let events = Arc::new(BroadcastEventChannel::default());
        let resolver = Arc::new(FileResolver::new(site_path.clone()));

        let import_api = Arc::new(ImportApi::new(
            db_path.clone(),
            resolver,
            config.clone(),
            events.clone(),
            runner.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            site_path,
            config,
            events,
            runner,
            import_api,
        })
    }
}

/// 读取非空环境变量
fn env_path(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 应用数据目录（不存在时创建）
fn app_data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("excel-import");
            // best-effort: 目录创建失败时由后续打开文件报错
            std::fs::create_dir_all(&dir).ok();
            dir
        }
        None => PathBuf::from("."),
    }
}

/// 获取默认数据库路径
///
/// 优先使用环境变量 EXCEL_IMPORT_DB，否则为用户数据目录下的 excel_import.db
pub fn get_default_db_path() -> String {
    if let Some(path) = env_path("EXCEL_IMPORT_DB") {
        return path;
    }
    app_data_dir()
        .join("excel_import.db")
        .to_string_lossy()
        .to_string()
}

/// 获取默认站点目录
///
/// 优先使用环境变量 EXCEL_IMPORT_SITE，否则为用户数据目录下的 site
pub fn get_default_site_path() -> PathBuf {
    if let Some(path) = env_path("EXCEL_IMPORT_SITE") {
        return PathBuf::from(path);
    }
    app_data_dir().join("site")
}
