// ==========================================
// 行情数据导入系统 - 行情仓储 Trait
// ==========================================
// 职责: 定义行情数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据读写
// ==========================================

use crate::domain::price_bar::{ImportRun, PriceBar, StoredBar};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

// ==========================================
// PriceBarRepository Trait
// ==========================================
// 用途: 分批落库的写入端
// 实现者: SqlitePriceBarRepository
pub trait PriceBarRepository {
    /// 建表（不存在时创建），立即生效
    fn ensure_table(&mut self) -> RepositoryResult<()>;

    /// 在单个事务中批量插入，成功后提交
    ///
    /// # 返回
    /// - Ok(usize): 插入行数
    /// - Err: 插入或提交失败（本批次回滚，之前已提交的批次不受影响）
    fn insert_batch(&mut self, bars: &[PriceBar]) -> RepositoryResult<usize>;
}

// ==========================================
// PriceBarQuery Trait
// ==========================================
// 用途: 报表/看板读取端
pub trait PriceBarQuery {
    /// 已存储数据的日期范围（空表返回 None）
    fn date_bounds(&self) -> RepositoryResult<Option<(NaiveDate, NaiveDate)>>;

    /// 按日期闭区间查询，按日期、id 升序
    fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> RepositoryResult<Vec<StoredBar>>;

    /// 总行数
    fn count_rows(&self) -> RepositoryResult<usize>;
}

// ==========================================
// ImportRunRepository Trait
// ==========================================
// 用途: 记录每次导入运行
pub trait ImportRunRepository {
    fn insert_import_run(&mut self, run: &ImportRun) -> RepositoryResult<()>;

    /// 最近的运行记录（按完成时间倒序）
    fn list_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<ImportRun>>;
}
