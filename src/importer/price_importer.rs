// ==========================================
// 行情数据导入系统 - 行情导入器
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 打开源 → 逐行映射 → 分批落库 → 记录导入运行
// ==========================================

use crate::config::config_manager::ConfigManager;
use crate::config::ingest_config::{ConfigOverrides, IngestConfig};
use crate::db::open_sqlite_connection;
use crate::domain::price_bar::ImportRun;
use crate::importer::batch_loader::BatchedLoader;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::UniversalFileParser;
use crate::repository::error::RepositoryError;
use crate::repository::price_bar_repo::{ImportRunRepository, PriceBarRepository};
use crate::repository::price_bar_repo_impl::SqlitePriceBarRepository;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

// ==========================================
// PriceImporter - 行情导入器
// ==========================================
pub struct PriceImporter<S>
where
    S: PriceBarRepository + ImportRunRepository,
{
    // 数据访问层（导入期间独占）
    repo: S,

    // 文件解析器
    parser: UniversalFileParser,

    config: IngestConfig,
}

impl PriceImporter<SqlitePriceBarRepository> {
    /// 打开数据库并按分层规则解析配置
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - overrides: 命令行覆写项
    pub fn open<P: AsRef<Path>>(db_path: P, overrides: &ConfigOverrides) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path.as_ref())
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        // 表名属于配置的一部分，先解析配置再绑定仓储
        let config = {
            let store = ConfigManager::from_connection(&conn)?;
            IngestConfig::resolve(Some(&store), overrides)?
        };
        let repo = SqlitePriceBarRepository::new(conn, &config.table_name)?;

        Self::new(repo, config)
    }
}

impl<S> PriceImporter<S>
where
    S: PriceBarRepository + ImportRunRepository,
{
    pub fn new(repo: S, config: IngestConfig) -> ImportResult<Self> {
        config.validate()?;
        let parser = UniversalFileParser::new(config.encoding()?);
        Ok(Self {
            repo,
            parser,
            config,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn repository(&self) -> &S {
        &self.repo
    }

    pub fn into_repository(self) -> S {
        self.repo
    }

    /// 导入单个文件（不报告进度）
    pub fn import_file<P: AsRef<Path>>(&mut self, file_path: P) -> ImportResult<ImportRun> {
        self.import_file_with_progress(file_path, |_| {})
    }

    /// 导入单个文件
    ///
    /// # 参数
    /// - file_path: .csv / .xlsx / .xls 文件
    /// - progress: 每个满批提交后以累计行数调用
    ///
    /// # 返回
    /// - Ok(ImportRun): 本次运行记录（已写入 import_run）
    /// - Err: 致命错误；已提交的批次保留，不写运行记录
    #[instrument(skip(self, file_path, progress), fields(run_id))]
    pub fn import_file_with_progress<P, F>(
        &mut self,
        file_path: P,
        progress: F,
    ) -> ImportResult<ImportRun>
    where
        P: AsRef<Path>,
        F: FnMut(usize),
    {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let path = file_path.as_ref();
        let file_path_str = path.display().to_string();
        info!(run_id = %run_id, file_path = %file_path_str, "开始导入行情数据");

        let source = self.parser.open(path).map_err(|e| {
            error!(error = %e, "文件打开失败");
            e
        })?;
        let source_format = source.format();

        let summary = BatchedLoader::new(&mut self.repo, self.config.batch_size)
            .with_progress(progress)
            .load(source)
            .map_err(|e| {
                error!(error = %e, "导入中断，已提交的批次保留");
                e
            })?;

        let run = ImportRun {
            run_id,
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            file_path: file_path_str,
            source_format,
            accepted: summary.accepted,
            rejected: summary.rejected,
            batches: summary.batches,
            imported_at: Utc::now(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        self.repo.insert_import_run(&run)?;

        info!(
            run_id = %run.run_id,
            accepted = run.accepted,
            rejected = run.rejected,
            batches = run.batches,
            elapsed_ms = run.elapsed_ms,
            "导入完成"
        );
        Ok(run)
    }
}
