// ==========================================
// Excel 导入系统 - 导入预检
// ==========================================
// 职责: 比对 Excel 表头与字段映射，给出三类列清单
//   - missing_fields:   Excel 有、映射没有
//   - mapped_fields:    映射有、Excel 也有
//   - missing_in_excel: 映射有、Excel 没有
// 约束: 只读表头，不改任何状态；内部错误以结构化结果返回
// ==========================================

use crate::domain::{FieldMapping, PreviewOutcome, PreviewReport};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser;
use crate::importer::file_resolver::FileResolver;
use crate::importer::mapping_provider::MappingProvider;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 表头 × 映射 → 预检报告
pub fn compare_headers(headers: &[String], mapping: &FieldMapping) -> PreviewReport {
    let missing_fields: Vec<String> = headers
        .iter()
        .filter(|h| !mapping.contains_column(h))
        .cloned()
        .collect();

    let (mapped_fields, missing_in_excel): (Vec<String>, Vec<String>) = mapping
        .columns()
        .map(str::to_string)
        .partition(|column| headers.contains(column));

    let has_missing = !missing_fields.is_empty() || !missing_in_excel.is_empty();

    PreviewReport {
        total_excel_columns: headers.len(),
        mapped_fields,
        missing_fields,
        missing_in_excel,
        has_missing,
    }
}

pub struct PreviewValidator {
    resolver: Arc<FileResolver>,
    mappings: Arc<MappingProvider>,
}

impl PreviewValidator {
    pub fn new(resolver: Arc<FileResolver>, mappings: Arc<MappingProvider>) -> Self {
        Self { resolver, mappings }
    }

    /// 预检入口（永不返回 Err）
    #[instrument(skip(self))]
    pub async fn preview(&self, entity_type: &str, file_reference: &str) -> PreviewOutcome {
        match self.try_preview(entity_type, file_reference).await {
            Ok(report) => {
                info!(
                    mapped = report.mapped_fields.len(),
                    missing_fields = report.missing_fields.len(),
                    missing_in_excel = report.missing_in_excel.len(),
                    "导入预检完成"
                );
                PreviewOutcome::Success(report)
            }
            Err(e) => {
                warn!(error = %e, "导入预检失败");
                PreviewOutcome::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn try_preview(
        &self,
        entity_type: &str,
        file_reference: &str,
    ) -> ImportResult<PreviewReport> {
        let path = self.resolver.resolve(file_reference)?;

        let mapping = self.mappings.get_mapping(entity_type).await;
        if mapping.is_empty() {
            return Err(ImportError::MappingNotFound(entity_type.to_string()));
        }

        let headers = tokio::task::spawn_blocking(move || file_parser::read_headers(&path))
            .await
            .map_err(|e| ImportError::InternalError(e.to_string()))??;

        Ok(compare_headers(&headers, &mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compare_headers_partitions() {
        let mapping = FieldMapping::from_pairs(vec![
            ("Name", "title"),
            ("Email", "email_addr"),
            ("Phone", "phone"),
        ]);
        let report = compare_headers(&headers(&["Email", "Name", "Notes"]), &mapping);

        assert_eq!(report.total_excel_columns, 3);
        assert_eq!(report.mapped_fields, vec!["Name", "Email"]);
        assert_eq!(report.missing_fields, vec!["Notes"]);
        assert_eq!(report.missing_in_excel, vec!["Phone"]);
        assert!(report.has_missing);
    }

    #[test]
    fn test_compare_headers_exact_match_has_no_missing() {
        let mapping = FieldMapping::from_pairs(vec![("Name", "title"), ("Email", "email_addr")]);
        let report = compare_headers(&headers(&["Name", "Email"]), &mapping);

        assert!(report.missing_fields.is_empty());
        assert!(report.missing_in_excel.is_empty());
        assert!(!report.has_missing);
    }

    #[test]
    fn test_mapped_and_missing_cover_mapping_keys() {
        let mapping = FieldMapping::from_pairs(vec![("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")]);
        let header_sets = [
            headers(&[]),
            headers(&["A", "B", "C", "D"]),
            headers(&["B", "X"]),
            headers(&["D", "Y", "A", "Z"]),
        ];

        for hs in &header_sets {
            let report = compare_headers(hs, &mapping);
            let mapped: BTreeSet<_> = report.mapped_fields.iter().cloned().collect();
            let missing: BTreeSet<_> = report.missing_in_excel.iter().cloned().collect();
            let keys: BTreeSet<String> = mapping.columns().map(str::to_string).collect();

            assert!(mapped.is_disjoint(&missing));
            assert_eq!(mapped.union(&missing).cloned().collect::<BTreeSet<_>>(), keys);

            let expected_extra: Vec<String> = hs
                .iter()
                .filter(|h| !keys.contains(*h))
                .cloned()
                .collect();
            assert_eq!(report.missing_fields, expected_extra);
        }
    }
}
