// ==========================================
// 行情数据导入系统 - 看板 API
// ==========================================
// 职责: 为报表/看板提供日期范围、区间查询与重采样序列
// 架构: API 层 → Repository (PriceBarQuery) + Engine (ResampleEngine)
// ==========================================

use chrono::NaiveDate;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::price_bar::{ResampledPoint, StoredBar};
use crate::domain::types::{Frequency, PriceColumn};
use crate::engine::resample::ResampleEngine;
use crate::repository::price_bar_repo::PriceBarQuery;

// ==========================================
// DashboardApi - 看板 API
// ==========================================
pub struct DashboardApi<Q: PriceBarQuery> {
    query: Q,
}

impl<Q: PriceBarQuery> DashboardApi<Q> {
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// 已存储数据的日期范围
    ///
    /// # 返回
    /// - Ok(None): 表中尚无数据
    pub fn date_bounds(&self) -> ApiResult<Option<(NaiveDate, NaiveDate)>> {
        Ok(self.query.date_bounds()?)
    }

    /// 按日期闭区间查询原始行
    pub fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<Vec<StoredBar>> {
        ensure_ordered(start, end)?;
        Ok(self.query.fetch_range(start, end)?)
    }

    /// 区间内指定价格列的重采样序列
    ///
    /// # 参数
    /// - start / end: 日期闭区间（start > end 报错）
    /// - frequency: 日 / 周 / 月
    /// - column: 参与均值计算的价格列
    pub fn resampled_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
        column: PriceColumn,
    ) -> ApiResult<Vec<ResampledPoint>> {
        let bars = self.fetch_range(start, end)?;
        let points = ResampleEngine::resample(&bars, column, frequency);
        debug!(
            rows = bars.len(),
            points = points.len(),
            frequency = %frequency,
            column = %column,
            "重采样完成"
        );
        Ok(points)
    }
}

fn ensure_ordered(start: NaiveDate, end: NaiveDate) -> ApiResult<()> {
    if start > end {
        return Err(ApiError::InvalidInput(format!(
            "开始日期 {} 晚于结束日期 {}",
            start, end
        )));
    }
    Ok(())
}
