// ==========================================
// Excel 导入系统 - 应用层
// ==========================================
// 职责: 组装仓储、服务与API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, get_default_site_path, AppState};
