// ==========================================
// Excel 导入系统 - 导入引擎
// ==========================================
// 职责: 整表读取 → 逐行映射/查重/新建或更新 → 提交 → 清理 → 完成事件
// 状态: running → completed / error（终态，不自动重试）
// 约束:
//   - 行按原始顺序串行处理，进度单调不减
//   - 单行失败只计数、记日志，不中断本次运行
//   - 运行级失败回滚本次写入，并发布 progress=0 / status=error 事件
// ==========================================

use crate::domain::{
    progress_percent, FieldMapping, ImportRow, ImportRun, ProgressEvent, RowOutcome, SheetData,
};
use crate::i18n::translate;
use crate::importer::conflict_handler::{decide, RowAction};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{unmapped_columns, FieldMapper};
use crate::importer::file_parser;
use crate::repository::{BlobStore, EntityStore};
use crate::services::ProgressPublisher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// 默认进度发布间隔（行）
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// 一次导入运行的输入（校验阶段产出）
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub entity_type: String,
    /// 已解析的本地文件路径
    pub file_path: PathBuf,
    /// 调用方传入的原始文件引用（用于清理文件目录记录）
    pub file_reference: String,
    pub mapping: FieldMapping,
    pub unique_field: Option<String>,
    pub allow_create: bool,
    pub allow_update: bool,
}

pub struct ImportEngine {
    store: Arc<dyn EntityStore>,
    blobs: Arc<dyn BlobStore>,
    publisher: ProgressPublisher,
    progress_interval: usize,
    locale: String,
}

impl ImportEngine {
    pub fn new(
        store: Arc<dyn EntityStore>,
        blobs: Arc<dyn BlobStore>,
        publisher: ProgressPublisher,
    ) -> Self {
        Self {
            store,
            blobs,
            publisher,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            locale: crate::i18n::DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// 执行一次导入
    ///
    /// 不向调用方返回错误：结果只通过进度事件与日志可见，
    /// 返回的 ImportRun 供调度方记录与测试断言使用
    #[instrument(skip(self, job), fields(entity_type = %job.entity_type))]
    pub async fn execute(&self, job: ImportJob) -> ImportRun {
        let mut run = ImportRun::new(job.entity_type.clone());
        info!(run_id = %run.run_id, file = %job.file_path.display(), "导入开始");

        if let Err(e) = self.run(&job, &mut run).await {
            error!(run_id = %run.run_id, error = %e, "导入失败");

            if let Err(rollback_err) = self.store.rollback().await {
                warn!(error = %rollback_err, "导入失败后回滚出错");
            }

            let reason = e.failure_reason(&self.locale);
            let message = translate(&self.locale, "import.failed", &[("error", reason.as_str())]);
            self.publisher.publish(&ProgressEvent::error(0, message));
            run.fail(reason);
        }

        run
    }

    async fn run(&self, job: &ImportJob, run: &mut ImportRun) -> ImportResult<()> {
        let path = job.file_path.clone();
        let sheet: SheetData = tokio::task::spawn_blocking(move || file_parser::read_sheet(&path))
            .await
            .map_err(|e| ImportError::ImportFailure(e.to_string()))??;

        let total_rows = sheet.total_rows();
        run.total_rows = total_rows;

        if total_rows == 0 {
            let message = translate(&self.locale, "import.no_data", &[]);
            warn!(run_id = %run.run_id, "Excel 文件无数据行");
            self.publisher.publish(&ProgressEvent::error(0, message.clone()));
            run.fail(message);
            return Ok(());
        }

        run.unmapped_columns = unmapped_columns(&sheet.headers, &job.mapping);
        let mapper = FieldMapper::new(
            job.entity_type.clone(),
            &job.mapping,
            &sheet.headers,
            job.unique_field.as_deref(),
        );
        debug!(bound_columns = mapper.bound_columns(), total_rows, "字段映射已绑定");

        self.store.begin().await?;

        for (idx, row) in sheet.rows.iter().enumerate() {
            let outcome = match self.process_row(job, &mapper, row).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        entity_type = %job.entity_type,
                        row = idx + 1,
                        sheet_row = row.row_number,
                        error = %e,
                        "行处理失败，继续下一行"
                    );
                    RowOutcome::Failed
                }
            };
            run.record(outcome);

            let processed = idx + 1;
            if processed % self.progress_interval == 0 || processed == total_rows {
                let current = processed.to_string();
                let total = total_rows.to_string();
                let message = translate(
                    &self.locale,
                    "import.processing_row",
                    &[("current", current.as_str()), ("total", total.as_str())],
                );
                self.publisher.publish(&ProgressEvent::in_progress(
                    progress_percent(processed, total_rows),
                    total_rows,
                    message,
                ));
            }
        }

        self.store.commit().await?;

        if !run.unmapped_columns.is_empty() {
            info!(
                run_id = %run.run_id,
                columns = ?run.unmapped_columns,
                "以下 Excel 列未配置映射，已忽略"
            );
        }

        self.cleanup(job).await;

        run.complete();
        info!(
            run_id = %run.run_id,
            created = run.created,
            updated = run.updated,
            skipped = run.skipped,
            errors = run.errors,
            "导入完成"
        );
        self.publisher
            .publish(&ProgressEvent::completed(total_rows, self.summary(run)));

        Ok(())
    }

    /// 单行: 映射 → 查重 → 决策 → 写入
    async fn process_row(
        &self,
        job: &ImportJob,
        mapper: &FieldMapper,
        row: &ImportRow,
    ) -> ImportResult<RowOutcome> {
        let record_error = |e: crate::repository::RepositoryError| ImportError::RecordError {
            row: row.row_number,
            message: e.to_string(),
        };

        let draft = mapper.map_row(row);

        let existing = match (job.unique_field.as_deref(), draft.unique_value.as_ref()) {
            (Some(field), Some(value)) => self
                .store
                .find_by_field(&job.entity_type, field, value)
                .await
                .map_err(record_error)?,
            _ => None,
        };

        match decide(existing, job.allow_create, job.allow_update) {
            RowAction::Create => {
                self.store.create(&draft).await.map_err(record_error)?;
                Ok(RowOutcome::Created)
            }
            RowAction::Update { key } => {
                self.store.update(&key, &draft).await.map_err(record_error)?;
                Ok(RowOutcome::Updated)
            }
            RowAction::Skip => Ok(RowOutcome::Skipped),
        }
    }

    /// 清理上传文件与文件目录记录（失败只记日志）
    async fn cleanup(&self, job: &ImportJob) {
        if let Err(e) = self.blobs.delete(&job.file_path).await {
            warn!(file = %job.file_path.display(), error = %e, "删除上传文件失败");
        }

        match self.blobs.find_catalog_entry(&job.file_reference).await {
            Ok(Some(name)) => {
                if let Err(e) = self.blobs.delete_catalog_entry(&name).await {
                    warn!(name = %name, error = %e, "删除文件目录记录失败");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(reference = %job.file_reference, error = %e, "查找文件目录记录失败"),
        }
    }

    fn summary(&self, run: &ImportRun) -> String {
        let created = run.created.to_string();
        let updated = run.updated.to_string();
        let skipped = run.skipped.to_string();
        let mut message = translate(
            &self.locale,
            "import.completed",
            &[
                ("created", created.as_str()),
                ("updated", updated.as_str()),
                ("skipped", skipped.as_str()),
            ],
        );
        if run.errors > 0 {
            let errors = run.errors.to_string();
            message.push_str(&translate(
                &self.locale,
                "import.completed_errors",
                &[("errors", errors.as_str())],
            ));
        }
        message
    }
}
