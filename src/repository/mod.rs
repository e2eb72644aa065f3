// ==========================================
// 行情数据导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有数值使用参数化绑定,表名在构造时校验
// ==========================================

pub mod error;
pub mod price_bar_repo;
pub mod price_bar_repo_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use price_bar_repo::{ImportRunRepository, PriceBarQuery, PriceBarRepository};
pub use price_bar_repo_impl::{validate_table_name, SqlitePriceBarRepository, DEFAULT_TABLE_NAME};
