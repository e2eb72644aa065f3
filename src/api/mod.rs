// ==========================================
// 行情数据导入系统 - API 层
// ==========================================
// 职责: 报表/看板的查询接口与导出
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod export;

// 重导出
pub use dashboard_api::DashboardApi;
pub use error::{ApiError, ApiResult};
pub use export::{write_series_csv, write_series_json};
