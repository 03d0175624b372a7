// ==========================================
// Excel 导入系统 - 导入领域模型
// ==========================================
// 职责: 记录草稿、单次导入运行统计、进度事件、预检结果
// 说明: 以上对象均为瞬时对象，不落库
// ==========================================

use crate::domain::types::{FieldValue, RunStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ==========================================
// ImportRow / SheetData - 工作表数据
// ==========================================

/// 一行 Excel 数据（单元格已归一化，按列序存放）
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    /// Excel 中的行号（1 起，表头为第 1 行）
    pub row_number: usize,
    pub cells: Vec<Option<FieldValue>>,
}

impl ImportRow {
    pub fn cell(&self, column_index: usize) -> Option<&FieldValue> {
        self.cells.get(column_index).and_then(|c| c.as_ref())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }
}

/// 整张工作表: 表头 + 全部数据行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<ImportRow>,
}

impl SheetData {
    /// 列名对应的列序（重名列取第一个）
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }
}

// ==========================================
// RecordDraft - 记录草稿
// ==========================================
// 由一行 Excel 数据按映射转换得到；空单元格不写入草稿
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDraft {
    pub entity_type: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// 唯一字段的取值（未配置唯一字段或单元格为空时为 None）
    pub unique_value: Option<FieldValue>,
}

impl RecordDraft {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: BTreeMap::new(),
            unique_value: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 转换为 JSON 对象（记录存储格式）
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Created,
    Updated,
    Skipped,
    Failed,
}

// ==========================================
// ImportRun - 单次导入运行统计
// ==========================================
// 生命周期: 导入开始时创建，逐行更新，完成事件发布后丢弃
#[derive(Debug, Clone, Serialize)]
pub struct ImportRun {
    pub run_id: String,
    pub entity_type: String,
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// 本次文件中未映射的列（去重）
    pub unmapped_columns: BTreeSet<String>,
    pub status: RunStatus,
    /// 失败原因（仅 status = error 时）
    pub failure: Option<String>,
}

impl ImportRun {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            entity_type: entity_type.into(),
            total_rows: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            errors: 0,
            unmapped_columns: BTreeSet::new(),
            status: RunStatus::InProgress,
            failure: None,
        }
    }

    /// 记录一行的处理结果
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Created => self.created += 1,
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Failed => self.errors += 1,
        }
    }

    /// 成功写入数（创建 + 更新）
    pub fn success_count(&self) -> usize {
        self.created + self.updated
    }

    /// 已处理行数
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.skipped + self.errors
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = RunStatus::Error;
        self.failure = Some(reason.into());
    }
}

// ==========================================
// ProgressEvent - 进度事件
// ==========================================
// 载荷字段: progress / total / message / status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "progress")]
    pub progress_percent: u32,
    #[serde(rename = "total")]
    pub total_rows: usize,
    pub message: String,
    pub status: RunStatus,
}

impl ProgressEvent {
    pub fn in_progress(progress_percent: u32, total_rows: usize, message: String) -> Self {
        Self {
            progress_percent: progress_percent.min(100),
            total_rows,
            message,
            status: RunStatus::InProgress,
        }
    }

    pub fn completed(total_rows: usize, message: String) -> Self {
        Self {
            progress_percent: 100,
            total_rows,
            message,
            status: RunStatus::Completed,
        }
    }

    pub fn error(total_rows: usize, message: String) -> Self {
        Self {
            progress_percent: 0,
            total_rows,
            message,
            status: RunStatus::Error,
        }
    }
}

/// 计算进度百分比: floor((processed / total) * 100)
pub fn progress_percent(processed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((processed.min(total) * 100) / total) as u32
}

// ==========================================
// PreviewReport - 导入预检结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewReport {
    pub total_excel_columns: usize,
    /// 映射中存在且 Excel 中也存在的列
    pub mapped_fields: Vec<String>,
    /// Excel 中存在但映射中没有的列
    pub missing_fields: Vec<String>,
    /// 映射中存在但 Excel 中没有的列
    pub missing_in_excel: Vec<String>,
    pub has_missing: bool,
}

/// 预检接口返回（成功 / 结构化错误）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewOutcome {
    Success(PreviewReport),
    Error { message: String },
}

impl PreviewOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PreviewOutcome::Success(_))
    }

    pub fn report(&self) -> Option<&PreviewReport> {
        match self {
            PreviewOutcome::Success(report) => Some(report),
            PreviewOutcome::Error { .. } => None,
        }
    }
}
