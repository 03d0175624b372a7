// ==========================================
// Excel 导入系统 - 新建/更新决策
// ==========================================
// 决策表:
//   已存在 + 允许更新 → 更新
//   已存在 + 禁止更新 → 跳过
//   不存在 + 允许新建 → 新建
//   不存在 + 禁止新建 → 跳过
// 跳过不计为错误
// ==========================================

/// 单行的写入动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    Create,
    Update { key: String },
    Skip,
}

/// 根据查重结果和导入开关决定动作
pub fn decide(existing: Option<String>, allow_create: bool, allow_update: bool) -> RowAction {
    match existing {
        Some(key) if allow_update => RowAction::Update { key },
        Some(_) => RowAction::Skip,
        None if allow_create => RowAction::Create,
        None => RowAction::Skip,
    }
}
