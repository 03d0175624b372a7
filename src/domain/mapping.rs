// ==========================================
// Excel 导入系统 - 字段映射领域模型
// ==========================================
// 职责: Excel 列名 → 目标实体字段名 的有序映射
// 存储: excel_field_mapping + field_mapping_child 表
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// FieldMapping - 字段映射
// ==========================================
// 约束: 列名唯一，保留首次出现的顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pairs: Vec<(String, String)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 (列名, 字段名) 序列构建
    ///
    /// 列名重复时，后出现的字段名覆盖先前的值，位置保持不变
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self::new();
        for (column, field) in pairs {
            mapping.insert(column, field);
        }
        mapping
    }

    /// 插入或覆盖一条映射
    pub fn insert(&mut self, column: impl Into<String>, field: impl Into<String>) {
        let column = column.into();
        let field = field.into();
        match self.pairs.iter_mut().find(|(c, _)| *c == column) {
            Some(existing) => existing.1 = field,
            None => self.pairs.push((column, field)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// 按顺序迭代 (列名, 字段名)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(c, f)| (c.as_str(), f.as_str()))
    }

    /// 映射中的 Excel 列名（有序）
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(c, _)| c.as_str())
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.pairs.iter().any(|(c, _)| c == column)
    }

    pub fn target_for(&self, column: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| f.as_str())
    }

    pub fn contains_target(&self, field: &str) -> bool {
        self.pairs.iter().any(|(_, f)| f == field)
    }
}

// ==========================================
// MappingDocument - 持久化的映射文档
// ==========================================
// 每个实体类型一份；unique_field 用于重复检测
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDocument {
    pub entity_type: String,
    pub unique_field: Option<String>,
    pub mapping: FieldMapping,
}

impl MappingDocument {
    pub fn new(entity_type: impl Into<String>, mapping: FieldMapping) -> Self {
        Self {
            entity_type: entity_type.into(),
            unique_field: None,
            mapping,
        }
    }

    pub fn with_unique_field(mut self, field: impl Into<String>) -> Self {
        self.unique_field = Some(field.into());
        self
    }

    /// 唯一字段是否指向某个已映射的目标字段
    ///
    /// 未配置唯一字段时返回 true
    pub fn unique_field_is_mapped(&self) -> bool {
        match &self.unique_field {
            Some(field) => self.mapping.contains_target(field),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_mapping_keeps_first_position_on_duplicate_column() {
        let mapping = FieldMapping::from_pairs(vec![
            ("Name", "title"),
            ("Email", "email_addr"),
            ("Name", "full_name"),
        ]);

        let pairs: Vec<_> = mapping.iter().collect();
        assert_eq!(pairs, vec![("Name", "full_name"), ("Email", "email_addr")]);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_field_mapping_lookup() {
        let mapping = FieldMapping::from_pairs(vec![("Name", "title")]);

        assert!(mapping.contains_column("Name"));
        assert!(!mapping.contains_column("name"));
        assert_eq!(mapping.target_for("Name"), Some("title"));
        assert!(mapping.contains_target("title"));
    }

    #[test]
    fn test_unique_field_is_mapped() {
        let mapping = FieldMapping::from_pairs(vec![("Email", "email_addr")]);

        let doc = MappingDocument::new("Contact", mapping.clone()).with_unique_field("email_addr");
        assert!(doc.unique_field_is_mapped());

        let doc = MappingDocument::new("Contact", mapping.clone()).with_unique_field("phone");
        assert!(!doc.unique_field_is_mapped());

        let doc = MappingDocument::new("Contact", mapping);
        assert!(doc.unique_field_is_mapped());
    }
}
