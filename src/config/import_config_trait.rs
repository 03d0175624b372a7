// ==========================================
// Excel 导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入流程所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::QueueClass;
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
// 约定: 配置缺失或无法解析时返回默认值，只有存储读取失败才返回 Err
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 后台调度 =====

    /// 导入任务使用的队列
    ///
    /// # 默认值
    /// - long
    async fn get_import_queue(&self) -> ConfigResult<QueueClass>;

    /// 导入任务的外部超时上限（秒）
    ///
    /// # 默认值
    /// - 3000
    async fn get_import_timeout_secs(&self) -> ConfigResult<u64>;

    /// long 队列的并发上限
    ///
    /// # 默认值
    /// - 2
    async fn get_long_queue_workers(&self) -> ConfigResult<usize>;

    // ===== 进度事件 =====

    /// 每处理多少行发布一次进度
    ///
    /// # 默认值
    /// - 10
    async fn get_progress_interval(&self) -> ConfigResult<usize>;

    /// 进度事件主题
    ///
    /// # 默认值
    /// - excel_import_progress
    async fn get_progress_topic(&self) -> ConfigResult<String>;

    /// 面向用户的消息语言（en / zh-CN）
    ///
    /// # 默认值
    /// - en
    async fn get_locale(&self) -> ConfigResult<String>;
}
