// ==========================================
// 行情数据导入系统 - 行情 Repository 实现
// ==========================================
// 职责: 实现行情数据访问（使用 rusqlite）
// 约束:
// - 只追加，不更新不删除
// - 每批一个事务，一次提交
// - 所有数值参数化绑定；表名在构造时校验
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::price_bar::{ImportRun, PriceBar, StoredBar};
use crate::domain::types::SourceFormat;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::price_bar_repo::{ImportRunRepository, PriceBarQuery, PriceBarRepository};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use tracing::debug;

/// 默认行情表名
pub const DEFAULT_TABLE_NAME: &str = "yahoo_data";

/// 价格列的小数位（对应 NUMERIC(18,4)）
const PRICE_SCALE: f64 = 10_000.0;

const CREATE_IMPORT_RUN_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS import_run (
    run_id TEXT PRIMARY KEY,
    file_name TEXT,
    file_path TEXT NOT NULL,
    source_format TEXT NOT NULL,
    accepted INTEGER NOT NULL,
    rejected INTEGER NOT NULL,
    batches INTEGER NOT NULL,
    imported_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL
)
"#;

// ==========================================
// SqlitePriceBarRepository
// ==========================================
pub struct SqlitePriceBarRepository {
    conn: Connection,
    table: String,
}

impl SqlitePriceBarRepository {
    /// 基于已有连接创建（连接由本实例独占）
    pub fn new(conn: Connection, table: &str) -> RepositoryResult<Self> {
        validate_table_name(table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    /// 打开数据库文件
    pub fn open<P: AsRef<Path>>(db_path: P, table: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path.as_ref())
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::new(conn, table)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn create_table_sql(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                open NUMERIC(18,4) NULL,
                high NUMERIC(18,4) NULL,
                low NUMERIC(18,4) NULL,
                close NUMERIC(18,4) NULL,
                adj_close NUMERIC(18,4) NULL,
                volume BIGINT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_date ON {table} (date);
            "#,
            table = self.table
        )
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (date, open, high, low, close, adj_close, volume) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            self.table
        )
    }
}

impl PriceBarRepository for SqlitePriceBarRepository {
    fn ensure_table(&mut self) -> RepositoryResult<()> {
        // 自动提交模式下 DDL 立即生效
        self.conn.execute_batch(&self.create_table_sql())?;
        self.conn.execute_batch(CREATE_IMPORT_RUN_SQL)?;
        debug!(table = %self.table, "行情表就绪");
        Ok(())
    }

    fn insert_batch(&mut self, bars: &[PriceBar]) -> RepositoryResult<usize> {
        let sql = self.insert_sql();
        let tx = self
            .conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for bar in bars {
                stmt.execute(params![
                    bar.date,
                    round_price(bar.open),
                    round_price(bar.high),
                    round_price(bar.low),
                    round_price(bar.close),
                    round_price(bar.adj_close),
                    bar.volume,
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }
}

impl PriceBarQuery for SqlitePriceBarRepository {
    fn date_bounds(&self) -> RepositoryResult<Option<(NaiveDate, NaiveDate)>> {
        let sql = format!("SELECT MIN(date), MAX(date) FROM {}", self.table);
        let (min, max): (Option<NaiveDate>, Option<NaiveDate>) = self
            .conn
            .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?;

        Ok(min.zip(max))
    }

    fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> RepositoryResult<Vec<StoredBar>> {
        if start > end {
            return Err(RepositoryError::InvalidArgument(format!(
                "开始日期 {} 晚于结束日期 {}",
                start, end
            )));
        }

        let sql = format!(
            "SELECT id, date, open, high, low, close, adj_close, volume \
             FROM {} WHERE date BETWEEN ?1 AND ?2 ORDER BY date, id",
            self.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![start, end], map_stored_bar)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row?);
        }
        Ok(bars)
    }

    fn count_rows(&self) -> RepositoryResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl ImportRunRepository for SqlitePriceBarRepository {
    fn insert_import_run(&mut self, run: &ImportRun) -> RepositoryResult<()> {
        self.conn.execute_batch(CREATE_IMPORT_RUN_SQL)?;
        self.conn.execute(
            r#"
            INSERT INTO import_run (
                run_id, file_name, file_path, source_format,
                accepted, rejected, batches, imported_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                run.run_id,
                run.file_name,
                run.file_path,
                run.source_format.to_string(),
                run.accepted as i64,
                run.rejected as i64,
                run.batches as i64,
                run.imported_at,
                run.elapsed_ms as i64,
            ],
        )?;
        Ok(())
    }

    fn list_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<ImportRun>> {
        self.conn.execute_batch(CREATE_IMPORT_RUN_SQL)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT run_id, file_name, file_path, source_format,
                   accepted, rejected, batches, imported_at, elapsed_ms
            FROM import_run
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let format: String = row.get(3)?;
            Ok(ImportRun {
                run_id: row.get(0)?,
                file_name: row.get(1)?,
                file_path: row.get(2)?,
                source_format: parse_source_format(&format),
                accepted: row.get::<_, i64>(4)? as usize,
                rejected: row.get::<_, i64>(5)? as usize,
                batches: row.get::<_, i64>(6)? as usize,
                imported_at: row.get(7)?,
                elapsed_ms: row.get::<_, i64>(8)? as u64,
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }
}

fn map_stored_bar(row: &Row<'_>) -> rusqlite::Result<StoredBar> {
    Ok(StoredBar {
        id: row.get(0)?,
        bar: PriceBar {
            date: row.get(1)?,
            open: row.get(2)?,
            high: row.get(3)?,
            low: row.get(4)?,
            close: row.get(5)?,
            adj_close: row.get(6)?,
            volume: row.get(7)?,
        },
    })
}

fn parse_source_format(raw: &str) -> SourceFormat {
    match raw.trim() {
        "EXCEL" => SourceFormat::Excel,
        _ => SourceFormat::Csv,
    }
}

/// 价格保留 4 位小数
fn round_price(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * PRICE_SCALE).round() / PRICE_SCALE)
}

/// 表名只允许 [A-Za-z_][A-Za-z0-9_]*
pub fn validate_table_name(name: &str) -> RepositoryResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidTableName(name.to_string()))
    }
}
