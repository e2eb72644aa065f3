// ==========================================
// 行情数据导入系统 - 引擎层
// ==========================================
// 职责: 实现行情聚合规则,不拼 SQL
// ==========================================

pub mod resample;

// 重导出核心引擎
pub use resample::ResampleEngine;
