// ==========================================
// 行情数据导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含导入逻辑
// ==========================================

pub mod price_bar;
pub mod types;

// 重导出核心类型
pub use price_bar::{ImportRun, LoadSummary, PriceBar, ResampledPoint, StoredBar};
pub use types::{Frequency, PriceColumn, SourceFormat};
