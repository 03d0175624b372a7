// ==========================================
// Excel 导入系统 - 领域类型定义
// ==========================================
// 职责: 字段取值、运行状态、队列等级等基础类型
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// 日期时间的标准文本格式（落库、比较、展示统一使用）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// 字段值 (Field Value)
// ==========================================
// 单元格取值归一化后的封闭标量集合
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// 类型名（日志用）
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::DateTime(_) => "datetime",
        }
    }

    /// 转换为 JSON 值（记录存储格式）
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(v) => serde_json::Value::String(v.clone()),
            FieldValue::Integer(v) => serde_json::Value::from(*v),
            FieldValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Boolean(v) => serde_json::Value::Bool(*v),
            FieldValue::DateTime(v) => {
                serde_json::Value::String(v.format(DATETIME_FORMAT).to_string())
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(v) => serializer.serialize_str(v),
            FieldValue::Integer(v) => serializer.serialize_i64(*v),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Boolean(v) => serializer.serialize_bool(*v),
            FieldValue::DateTime(v) => {
                serializer.serialize_str(&v.format(DATETIME_FORMAT).to_string())
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::DateTime(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
        }
    }
}

// ==========================================
// 运行状态 (Run Status)
// ==========================================
// 序列化格式: snake_case (与进度事件一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress, // 执行中
    Completed,  // 已完成
    Error,      // 失败（终态）
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::InProgress)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 队列等级 (Queue Class)
// ==========================================
// 后台任务调度使用的队列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueClass {
    Short,
    Default,
    Long,
}

impl QueueClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueClass::Short => "short",
            QueueClass::Default => "default",
            QueueClass::Long => "long",
        }
    }

    /// 宽松解析（未知值返回 None，由调用方决定默认值）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "short" => Some(QueueClass::Short),
            "default" => Some(QueueClass::Default),
            "long" => Some(QueueClass::Long),
            _ => None,
        }
    }
}

impl fmt::Display for QueueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_field_value_datetime_serializes_as_standard_text() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 20)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        let value = FieldValue::DateTime(dt);

        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            "\"2025-01-20 08:30:00\""
        );
        assert_eq!(value.to_json(), serde_json::json!("2025-01-20 08:30:00"));
    }

    #[test]
    fn test_field_value_scalars_serialize_untagged() {
        assert_eq!(serde_json::to_string(&FieldValue::Integer(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&FieldValue::Boolean(true)).unwrap(), "true");
        assert_eq!(
            serde_json::to_string(&FieldValue::Text("a@x.com".to_string())).unwrap(),
            "\"a@x.com\""
        );
    }

    #[test]
    fn test_run_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RunStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert!(RunStatus::Completed.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_queue_class_parse() {
        assert_eq!(QueueClass::parse(" LONG "), Some(QueueClass::Long));
        assert_eq!(QueueClass::parse("short"), Some(QueueClass::Short));
        assert_eq!(QueueClass::parse("fast"), None);
    }
}
