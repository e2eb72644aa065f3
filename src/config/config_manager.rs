// ==========================================
// 行情数据导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

const GLOBAL_SCOPE: &str = "global";

const CREATE_CONFIG_KV_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
)
"#;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
// 借用导入运行所独占的连接，不另开连接
pub struct ConfigManager<'c> {
    conn: &'c Connection,
}

impl<'c> ConfigManager<'c> {
    /// 从已有连接创建 ConfigManager（config_kv 不存在时创建）
    pub fn from_connection(conn: &'c Connection) -> RepositoryResult<Self> {
        conn.execute_batch(CREATE_CONFIG_KV_SQL)?;
        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// global scope 下所有配置（按 key 排序）
    pub fn list_global_config(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config.insert(key, value);
        }
        Ok(config)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const BATCH_SIZE: &str = "ingest/batch_size";
    pub const FALLBACK_ENCODING: &str = "ingest/fallback_encoding";
    pub const TABLE_NAME: &str = "ingest/table_name";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_none() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = ConfigManager::from_connection(&conn).unwrap();
        assert_eq!(
            manager.get_global_config_value(config_keys::BATCH_SIZE).unwrap(),
            None
        );
    }

    #[test]
    fn test_set_overwrites_value() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = ConfigManager::from_connection(&conn).unwrap();

        manager.set_global_config_value(config_keys::BATCH_SIZE, "100").unwrap();
        manager.set_global_config_value(config_keys::BATCH_SIZE, "250").unwrap();

        assert_eq!(
            manager.get_global_config_value(config_keys::BATCH_SIZE).unwrap(),
            Some("250".to_string())
        );
        assert_eq!(manager.list_global_config().unwrap().len(), 1);
    }

    #[test]
    fn test_from_connection_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(&conn)
            .unwrap()
            .set_global_config_value(config_keys::FALLBACK_ENCODING, "cp1252")
            .unwrap();

        let again = ConfigManager::from_connection(&conn).unwrap();
        assert_eq!(
            again.get_global_config_value(config_keys::FALLBACK_ENCODING).unwrap(),
            Some("cp1252".to_string())
        );
    }
}
