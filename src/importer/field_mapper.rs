// ==========================================
// Excel 导入系统 - 字段映射器
// ==========================================
// 职责: 单元格归一化 + Excel 行 → 记录草稿
// 规则:
//   - 空单元格 / 空白字符串 / 错误单元格不写入草稿
//   - 整数值浮点数转为整数，日期单元格转为标准日期时间
//   - 目标字段为唯一字段时同时记录 unique_value
// ==========================================

use crate::domain::{FieldMapping, FieldValue, ImportRow, RecordDraft, DATETIME_FORMAT};
use calamine::Data;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

/// 单元格 → 标准标量（None 表示空值）
pub fn normalize_cell(cell: &Data) -> Option<FieldValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(FieldValue::Text(trimmed.to_string()))
            }
        }
        Data::Int(i) => Some(FieldValue::Integer(*i)),
        Data::Float(f) => normalize_float(*f),
        Data::Bool(b) => Some(FieldValue::Boolean(*b)),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => Some(FieldValue::DateTime(value)),
            None => normalize_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => {
            Some(parse_iso_datetime(s).map_or_else(|| FieldValue::Text(s.clone()), FieldValue::DateTime))
        }
        Data::DurationIso(s) => Some(FieldValue::Text(s.clone())),
    }
}

fn normalize_float(f: f64) -> Option<FieldValue> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(FieldValue::Integer(f as i64))
    } else {
        Some(FieldValue::Float(f))
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, DATETIME_FORMAT))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Excel 中存在但映射中没有的列
pub fn unmapped_columns(headers: &[String], mapping: &FieldMapping) -> BTreeSet<String> {
    headers
        .iter()
        .filter(|h| !mapping.contains_column(h))
        .cloned()
        .collect()
}

// ==========================================
// FieldMapper
// ==========================================
// 构造时把映射绑定到表头列序，逐行转换时不再查找列名
pub struct FieldMapper {
    entity_type: String,
    /// (列序, 目标字段)，保持映射顺序；Excel 中不存在的列不参与绑定
    bindings: Vec<(usize, String)>,
    unique_field: Option<String>,
}

impl FieldMapper {
    pub fn new(
        entity_type: impl Into<String>,
        mapping: &FieldMapping,
        headers: &[String],
        unique_field: Option<&str>,
    ) -> Self {
        let bindings = mapping
            .iter()
            .filter_map(|(column, target)| {
                headers
                    .iter()
                    .position(|h| h == column)
                    .map(|idx| (idx, target.to_string()))
            })
            .collect();

        Self {
            entity_type: entity_type.into(),
            bindings,
            unique_field: unique_field.map(str::to_string),
        }
    }

    /// 已绑定的列数
    pub fn bound_columns(&self) -> usize {
        self.bindings.len()
    }

    /// 一行 → 记录草稿
    pub fn map_row(&self, row: &ImportRow) -> RecordDraft {
        let mut draft = RecordDraft::new(self.entity_type.clone());

        for (column_index, target) in &self.bindings {
            let Some(value) = row.cell(*column_index) else {
                continue;
            };

            if self.unique_field.as_deref() == Some(target.as_str()) {
                draft.unique_value = Some(value.clone());
            }
            draft.fields.insert(target.clone(), value.clone());
        }

        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(cells: Vec<Option<FieldValue>>) -> ImportRow {
        ImportRow {
            row_number: 2,
            cells,
        }
    }

    #[test]
    fn test_normalize_cell_scalars() {
        assert_eq!(normalize_cell(&Data::Empty), None);
        assert_eq!(normalize_cell(&Data::String("   ".to_string())), None);
        assert_eq!(
            normalize_cell(&Data::String(" Alice ".to_string())),
            Some(FieldValue::Text("Alice".to_string()))
        );
        assert_eq!(normalize_cell(&Data::Float(42.0)), Some(FieldValue::Integer(42)));
        assert_eq!(normalize_cell(&Data::Float(2.5)), Some(FieldValue::Float(2.5)));
        assert_eq!(normalize_cell(&Data::Float(f64::NAN)), None);
        assert_eq!(normalize_cell(&Data::Int(7)), Some(FieldValue::Integer(7)));
        assert_eq!(normalize_cell(&Data::Bool(true)), Some(FieldValue::Boolean(true)));
    }

    #[test]
    fn test_normalize_iso_datetime() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(
            normalize_cell(&Data::DateTimeIso("2025-03-01T12:00:00".to_string())),
            Some(FieldValue::DateTime(expected))
        );
        assert_eq!(
            normalize_cell(&Data::DateTimeIso("not a date".to_string())),
            Some(FieldValue::Text("not a date".to_string()))
        );
    }

    #[test]
    fn test_map_row_omits_empty_cells_and_tracks_unique_value() {
        let mapping = FieldMapping::from_pairs(vec![("Name", "title"), ("Email", "email_addr")]);
        let mapper = FieldMapper::new(
            "Contact",
            &mapping,
            &headers(&["Name", "Email", "Notes"]),
            Some("email_addr"),
        );
        assert_eq!(mapper.bound_columns(), 2);

        let alice = mapper.map_row(&row(vec![
            Some(FieldValue::Text("Alice".to_string())),
            Some(FieldValue::Text("a@x.com".to_string())),
            Some(FieldValue::Text("vip".to_string())),
        ]));
        assert_eq!(alice.fields.len(), 2);
        assert_eq!(
            alice.unique_value,
            Some(FieldValue::Text("a@x.com".to_string()))
        );

        let bob = mapper.map_row(&row(vec![Some(FieldValue::Text("Bob".to_string())), None, None]));
        assert_eq!(bob.fields.len(), 1);
        assert!(!bob.fields.contains_key("email_addr"));
        assert_eq!(bob.unique_value, None);
    }

    #[test]
    fn test_map_row_ignores_columns_missing_from_sheet() {
        let mapping = FieldMapping::from_pairs(vec![("Name", "title"), ("Phone", "phone")]);
        let mapper = FieldMapper::new("Contact", &mapping, &headers(&["Name"]), None);

        let draft = mapper.map_row(&row(vec![Some(FieldValue::Text("Carol".to_string()))]));
        assert_eq!(draft.fields.len(), 1);
        assert_eq!(draft.unique_value, None);
    }

    #[test]
    fn test_unmapped_columns_are_deduplicated() {
        let mapping = FieldMapping::from_pairs(vec![("Name", "title")]);
        let cols = unmapped_columns(&headers(&["Name", "Notes", "Notes", "Age"]), &mapping);
        assert_eq!(cols.into_iter().collect::<Vec<_>>(), vec!["Age", "Notes"]);
    }
}
