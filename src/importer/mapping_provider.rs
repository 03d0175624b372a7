// ==========================================
// Excel 导入系统 - 映射提供者
// ==========================================
// 职责: 读取实体类型的字段映射与唯一字段
// 策略: 宽松失败：读取出错时返回空映射 / None，并记录告警；
//       调用方把空映射视为"未配置"
// ==========================================

use crate::domain::FieldMapping;
use crate::repository::FieldMappingRepository;
use std::sync::Arc;
use tracing::warn;

pub struct MappingProvider {
    repo: Arc<dyn FieldMappingRepository>,
}

impl MappingProvider {
    pub fn new(repo: Arc<dyn FieldMappingRepository>) -> Self {
        Self { repo }
    }

    /// 映射文档是否存在（读取出错视为不存在）
    pub async fn has_mapping(&self, entity_type: &str) -> bool {
        match self.repo.mapping_exists(entity_type).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(entity_type, error = %e, "检查字段映射失败");
                false
            }
        }
    }

    /// 列名 → 目标字段（保持子行顺序）
    pub async fn get_mapping(&self, entity_type: &str) -> FieldMapping {
        match self.repo.load_mapping(entity_type).await {
            Ok(document) => document.mapping,
            Err(e) => {
                warn!(entity_type, error = %e, "读取字段映射失败，按未配置处理");
                FieldMapping::new()
            }
        }
    }

    /// 唯一字段（未配置或读取出错时为 None）
    pub async fn get_unique_field(&self, entity_type: &str) -> Option<String> {
        match self.repo.load_mapping(entity_type).await {
            Ok(document) => {
                if !document.unique_field_is_mapped() {
                    if let Some(field) = &document.unique_field {
                        warn!(
                            entity_type,
                            unique_field = %field,
                            "唯一字段不在映射目标字段中，重复检测不会生效"
                        );
                    }
                }
                document.unique_field
            }
            Err(e) => {
                warn!(entity_type, error = %e, "读取唯一字段失败");
                None
            }
        }
    }
}
