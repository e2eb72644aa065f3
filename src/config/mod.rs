// ==========================================
// 行情数据导入系统 - 配置层
// ==========================================
// 职责: 导入配置管理,支持多级覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod ingest_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use ingest_config::{resolve_encoding, ConfigOverrides, IngestConfig};
