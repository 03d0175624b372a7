// ==========================================
// Excel 导入API
// ==========================================
// 职责: 可导入实体类型检索、导入预检、启动导入、映射维护
// 说明: 校验阶段在调用方上下文同步执行；执行阶段交给任务调度器，
//       调用方只得到"已受理"确认，结果通过进度事件获取
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfigReader;
use crate::domain::{FieldMapping, MappingDocument, PreviewOutcome, ProgressEvent};
use crate::i18n::translate;
use crate::importer::{
    FileResolver, ImportEngine, ImportError, ImportJob, MappingProvider, PreviewValidator,
};
use crate::repository::{
    EntityTypeCatalog, FieldMappingRepository, LocalBlobStore, Pagination, SqliteEntityStore,
    SqliteFieldMappingRepository,
};
use crate::services::{EventChannel, ProgressPublisher, ScheduleOptions, TaskRunner};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// 实体类型检索的单页上限
pub const MAX_PAGE_SIZE: usize = 500;

/// 启动导入的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartImportResponse {
    pub status: String,
    pub message: String,
}

/// 导入API
pub struct ImportApi {
    db_path: String,
    resolver: Arc<FileResolver>,
    config: Arc<dyn ImportConfigReader>,
    events: Arc<dyn EventChannel>,
    runner: Arc<dyn TaskRunner>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(
        db_path: String,
        resolver: Arc<FileResolver>,
        config: Arc<dyn ImportConfigReader>,
        events: Arc<dyn EventChannel>,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            db_path,
            resolver,
            config,
            events,
            runner,
        }
    }

    fn mapping_provider(&self) -> ApiResult<MappingProvider> {
        let repo = SqliteFieldMappingRepository::new(&self.db_path)?;
        Ok(MappingProvider::new(Arc::new(repo)))
    }

    async fn locale(&self) -> String {
        match self.config.get_locale().await {
            Ok(locale) => locale,
            Err(e) => {
                warn!(error = %e, "读取语言配置失败，使用默认语言");
                crate::i18n::DEFAULT_LOCALE.to_string()
            }
        }
    }

    // ==========================================
    // 可导入实体类型
    // ==========================================

    /// 列出可导入的实体类型
    ///
    /// # 参数
    /// - search: 名称子串过滤（可选）
    /// - offset / limit: 分页（limit 为 0 时取默认页大小）
    pub async fn list_importable_entity_types(
        &self,
        search: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> ApiResult<Vec<String>> {
        let limit = if limit == 0 {
            Pagination::default().limit
        } else {
            limit.min(MAX_PAGE_SIZE)
        };

        let store = SqliteEntityStore::new(&self.db_path)?;
        let names = store
            .list_entity_types(search, Pagination::new(offset, limit))
            .await?;
        Ok(names)
    }

    // ==========================================
    // 导入预检
    // ==========================================

    /// 导入预检（内部错误以 status=error 的结果返回）
    pub async fn preview_import(&self, entity_type: &str, file_reference: &str) -> PreviewOutcome {
        let entity_type = entity_type.trim();
        if entity_type.is_empty() {
            let locale = self.locale().await;
            return PreviewOutcome::Error {
                message: translate(&locale, "import.arguments_required", &[]),
            };
        }

        let mappings = match self.mapping_provider() {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "打开映射存储失败");
                return PreviewOutcome::Error {
                    message: e.to_string(),
                };
            }
        };

        PreviewValidator::new(self.resolver.clone(), Arc::new(mappings))
            .preview(entity_type, file_reference)
            .await
    }

    // ==========================================
    // 启动导入
    // ==========================================

    /// 启动导入
    ///
    /// # 参数
    /// - allow_create: 未找到已有记录时是否新建
    /// - allow_update: 找到已有记录时是否更新
    /// - user: 发起导入的用户（进度事件发送给该用户）
    ///
    /// # 返回
    /// - Ok: 已受理（status = success）
    /// - Err: 校验失败（参数缺失 / 映射未配置 / 文件不存在 / 格式不支持）
    #[instrument(skip(self))]
    pub async fn start_import(
        &self,
        entity_type: &str,
        file_reference: &str,
        allow_create: bool,
        allow_update: bool,
        user: Option<&str>,
    ) -> ApiResult<StartImportResponse> {
        let locale = self.locale().await;
        let entity_type = entity_type.trim();
        let file_reference = file_reference.trim();

        if entity_type.is_empty() || file_reference.is_empty() {
            return Err(ImportError::InvalidArgument(translate(
                &locale,
                "import.arguments_required",
                &[],
            ))
            .into());
        }

        let mappings = self.mapping_provider()?;
        if !mappings.has_mapping(entity_type).await {
            return Err(ImportError::MappingNotFound(translate(
                &locale,
                "import.mapping_required",
                &[],
            ))
            .into());
        }

        let file_path = self.resolver.resolve(file_reference)?;

        let mapping = mappings.get_mapping(entity_type).await;
        let unique_field = mappings.get_unique_field(entity_type).await;
        if mapping.is_empty() {
            return Err(ImportError::MappingNotFound(translate(
                &locale,
                "import.mapping_empty",
                &[("entity", entity_type)],
            ))
            .into());
        }

        let config_err = |e: Box<dyn std::error::Error + Send + Sync>| {
            ApiError::InternalError(format!("读取导入配置失败: {}", e))
        };
        let queue = self.config.get_import_queue().await.map_err(config_err)?;
        let timeout_secs = self.config.get_import_timeout_secs().await.map_err(config_err)?;
        let interval = self.config.get_progress_interval().await.map_err(config_err)?;
        let topic = self.config.get_progress_topic().await.map_err(config_err)?;

        // 每次运行独占连接，从而持有自己的事务
        let store = SqliteEntityStore::new(&self.db_path)?;
        let blobs = LocalBlobStore::new(&self.db_path)?;
        let publisher = ProgressPublisher::new(self.events.clone(), topic, user.map(str::to_string));
        let timeout_publisher = publisher.clone();
        let engine = ImportEngine::new(Arc::new(store), Arc::new(blobs), publisher)
            .with_progress_interval(interval)
            .with_locale(locale.clone());

        let job = ImportJob {
            entity_type: entity_type.to_string(),
            file_path,
            file_reference: file_reference.to_string(),
            mapping,
            unique_field,
            allow_create,
            allow_update,
        };

        // 超时的运行不会走到引擎的失败分支，由调度器补发终态事件
        let seconds = timeout_secs.to_string();
        let timed_out = translate(&locale, "import.timed_out", &[("seconds", seconds.as_str())]);
        let timeout_message = translate(&locale, "import.failed", &[("error", timed_out.as_str())]);
        let options = ScheduleOptions::new(
            queue,
            Duration::from_secs(timeout_secs),
            format!("excel_import:{}", entity_type),
        )
        .on_timeout(move || {
            timeout_publisher.publish(&ProgressEvent::error(0, timeout_message));
        });

        self.runner
            .schedule(
                async move {
                    engine.execute(job).await;
                }
                .boxed(),
                options,
            )
            .map_err(|e| ImportError::SchedulingError(e.to_string()))?;

        info!(entity_type, queue = %queue, "导入任务已调度");

        Ok(StartImportResponse {
            status: "success".to_string(),
            message: translate(&locale, "import.started", &[]),
        })
    }

    // ==========================================
    // 映射维护
    // ==========================================

    /// 保存字段映射（整体替换），并登记实体类型
    pub async fn save_mapping(
        &self,
        entity_type: &str,
        mapping: FieldMapping,
        unique_field: Option<&str>,
    ) -> ApiResult<()> {
        let entity_type = entity_type.trim();
        if entity_type.is_empty() {
            return Err(ApiError::InvalidInput("entity type is required".to_string()));
        }
        if mapping.is_empty() {
            return Err(ApiError::InvalidInput("mapping must not be empty".to_string()));
        }

        let mut document = MappingDocument::new(entity_type, mapping);
        if let Some(field) = unique_field.map(str::trim).filter(|f| !f.is_empty()) {
            document = document.with_unique_field(field);
        }
        if !document.unique_field_is_mapped() {
            warn!(
                entity_type,
                unique_field = ?document.unique_field,
                "唯一字段不在映射目标字段中，重复检测不会生效"
            );
        }

        let repo = SqliteFieldMappingRepository::new(&self.db_path)?;
        repo.save_mapping(&document).await?;
        self.register_entity_type(entity_type, false).await?;

        info!(entity_type, columns = document.mapping.len(), "字段映射已保存");
        Ok(())
    }

    /// 登记可导入的实体类型
    pub async fn register_entity_type(&self, name: &str, is_child: bool) -> ApiResult<()> {
        let store = SqliteEntityStore::new(&self.db_path)?;
        store.register_entity_type(name, is_child).await?;
        Ok(())
    }
}
