// ==========================================
// 行情数据导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 表格行情文件 (CSV / Excel) → 关系库的批量导入管道
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 聚合规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 报表查询与导出
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Frequency, PriceColumn, SourceFormat};

// 领域实体
pub use domain::{ImportRun, LoadSummary, PriceBar, ResampledPoint, StoredBar};

// 导入
pub use importer::{BatchedLoader, FieldMapper, FieldNormalizer, PriceImporter, RawRecord};

// 配置
pub use config::{ConfigOverrides, IngestConfig};

// 引擎
pub use engine::ResampleEngine;

// API
pub use api::DashboardApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "行情数据导入系统";
