// ==========================================
// 行情数据导入系统 - 导入配置
// ==========================================
// 职责: 导入参数的分层解析与校验
// 优先级(低 → 高): 内置默认值 → config_kv → 环境变量 → 命令行
// ==========================================

use crate::config::config_manager::{config_keys, ConfigManager};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::price_bar_repo_impl::{validate_table_name, DEFAULT_TABLE_NAME};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_FALLBACK_ENCODING: &str = "latin1";

pub const BATCH_SIZE_ENV: &str = "PRICE_INGEST_BATCH_SIZE";
pub const FALLBACK_ENCODING_ENV: &str = "PRICE_INGEST_FALLBACK_ENCODING";
pub const TABLE_NAME_ENV: &str = "PRICE_INGEST_TABLE_NAME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub fallback_encoding: String,
    pub table_name: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            fallback_encoding: DEFAULT_FALLBACK_ENCODING.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

/// 命令行覆写项
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub batch_size: Option<usize>,
    pub fallback_encoding: Option<String>,
    pub table_name: Option<String>,
}

impl IngestConfig {
    /// 按优先级解析完整配置并校验
    ///
    /// # 参数
    /// - store: 目标数据库中的 config_kv（None 时跳过该层）
    /// - overrides: 命令行覆写项
    pub fn resolve(
        store: Option<&ConfigManager<'_>>,
        overrides: &ConfigOverrides,
    ) -> ImportResult<Self> {
        let mut config = Self::default();
        if let Some(store) = store {
            config.apply_store(store)?;
        }
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;

        debug!(
            batch_size = config.batch_size,
            fallback_encoding = %config.fallback_encoding,
            table = %config.table_name,
            "导入配置已解析"
        );
        Ok(config)
    }

    pub fn apply_store(&mut self, store: &ConfigManager<'_>) -> ImportResult<()> {
        if let Some(raw) = store.get_global_config_value(config_keys::BATCH_SIZE)? {
            self.batch_size = parse_batch_size(config_keys::BATCH_SIZE, &raw)?;
        }
        if let Some(raw) = store.get_global_config_value(config_keys::FALLBACK_ENCODING)? {
            self.fallback_encoding = raw.trim().to_string();
        }
        if let Some(raw) = store.get_global_config_value(config_keys::TABLE_NAME)? {
            self.table_name = raw.trim().to_string();
        }
        Ok(())
    }

    /// 环境变量层（空值视为未设置）
    pub fn apply_env_with<F>(&mut self, lookup: F) -> ImportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = lookup(BATCH_SIZE_ENV) {
            self.batch_size = parse_batch_size(BATCH_SIZE_ENV, &raw)?;
        }
        if let Some(raw) = lookup(FALLBACK_ENCODING_ENV) {
            self.fallback_encoding = raw.trim().to_string();
        }
        if let Some(raw) = lookup(TABLE_NAME_ENV) {
            self.table_name = raw.trim().to_string();
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(label) = &overrides.fallback_encoding {
            self.fallback_encoding = label.trim().to_string();
        }
        if let Some(table) = &overrides.table_name {
            self.table_name = table.trim().to_string();
        }
    }

    pub fn validate(&self) -> ImportResult<()> {
        if self.batch_size == 0 {
            return Err(ImportError::ConfigValueError {
                key: "batch_size".to_string(),
                value: "0".to_string(),
                message: "批次大小必须 ≥ 1".to_string(),
            });
        }
        self.encoding()?;
        validate_table_name(&self.table_name)?;
        Ok(())
    }

    /// 回退编码（WHATWG 标签解析，必须兼容 ASCII）
    pub fn encoding(&self) -> ImportResult<&'static Encoding> {
        resolve_encoding(&self.fallback_encoding)
    }
}

pub fn resolve_encoding(label: &str) -> ImportResult<&'static Encoding> {
    let error = |message: &str| ImportError::ConfigValueError {
        key: "fallback_encoding".to_string(),
        value: label.to_string(),
        message: message.to_string(),
    };

    let encoding =
        Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| error("未知的编码标签"))?;
    if !encoding.is_ascii_compatible() {
        return Err(error("回退编码必须兼容 ASCII"));
    }
    Ok(encoding)
}

fn parse_batch_size(key: &str, raw: &str) -> ImportResult<usize> {
    let error = |message: String| ImportError::ConfigValueError {
        key: key.to_string(),
        value: raw.to_string(),
        message,
    };

    let size = raw
        .trim()
        .parse::<usize>()
        .map_err(|e| error(e.to_string()))?;
    if size == 0 {
        return Err(error("批次大小必须 ≥ 1".to_string()));
    }
    Ok(size)
}
