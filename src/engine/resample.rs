// ==========================================
// 行情数据导入系统 - 重采样引擎
// ==========================================
// 职责: 按日/周/月对已落库行分桶聚合
// 规则:
// - 价格取桶内非空值的均值（全空时为 None）
// - 成交量取桶内非空值之和（全空时为 0）
// - 只输出含行的桶，按日期升序
// 红线: Engine 不拼 SQL
// ==========================================

use crate::domain::price_bar::{ResampledPoint, StoredBar};
use crate::domain::types::{Frequency, PriceColumn};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

#[derive(Default)]
struct Bucket {
    price_sum: f64,
    price_count: usize,
    volume: i64,
    rows: usize,
}

pub struct ResampleEngine;

impl ResampleEngine {
    /// 桶标签
    ///
    /// - Daily: 当天
    /// - Weekly: 该周结束的周日
    /// - Monthly: 当月 1 日
    pub fn bucket_label(date: NaiveDate, frequency: Frequency) -> NaiveDate {
        match frequency {
            Frequency::Daily => date,
            Frequency::Weekly => {
                let days_to_sunday = (7 - date.weekday().num_days_from_sunday()) % 7;
                date.checked_add_days(Days::new(u64::from(days_to_sunday)))
                    .unwrap_or(date)
            }
            Frequency::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// 按频率聚合: 价格取非空值均值，成交量求和
    ///
    /// 只输出含数据的桶，首尾之间没有数据的周期不补空点。
    pub fn resample(
        bars: &[StoredBar],
        column: PriceColumn,
        frequency: Frequency,
    ) -> Vec<ResampledPoint> {
        let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();

        for stored in bars {
            let bar = &stored.bar;
            let bucket = buckets
                .entry(Self::bucket_label(bar.date, frequency))
                .or_default();

            bucket.rows += 1;
            if let Some(price) = bar.price(column) {
                bucket.price_sum += price;
                bucket.price_count += 1;
            }
            if let Some(volume) = bar.volume {
                bucket.volume = bucket.volume.saturating_add(volume);
            }
        }

        buckets
            .into_iter()
            .map(|(date, bucket)| ResampledPoint {
                date,
                value: (bucket.price_count > 0)
                    .then(|| bucket.price_sum / bucket.price_count as f64),
                volume: bucket.volume,
                rows: bucket.rows,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_bar::PriceBar;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored(id: i64, date: NaiveDate, close: Option<f64>, volume: Option<i64>) -> StoredBar {
        let mut bar = PriceBar::empty(date);
        bar.close = close;
        bar.volume = volume;
        StoredBar { id, bar }
    }

    #[test]
    fn test_weekly_label_is_sunday() {
        // 2024-03-04 是周一，2024-03-10 是周日
        assert_eq!(
            ResampleEngine::bucket_label(ymd(2024, 3, 4), Frequency::Weekly),
            ymd(2024, 3, 10)
        );
        assert_eq!(
            ResampleEngine::bucket_label(ymd(2024, 3, 10), Frequency::Weekly),
            ymd(2024, 3, 10)
        );
        assert_eq!(
            ResampleEngine::bucket_label(ymd(2024, 3, 11), Frequency::Weekly),
            ymd(2024, 3, 17)
        );
    }

    #[test]
    fn test_monthly_label_is_first_day() {
        assert_eq!(
            ResampleEngine::bucket_label(ymd(2024, 2, 29), Frequency::Monthly),
            ymd(2024, 2, 1)
        );
    }

    #[test]
    fn test_weekly_mean_and_volume_sum() {
        let bars = vec![
            stored(1, ymd(2024, 3, 4), Some(10.0), Some(100)),
            stored(2, ymd(2024, 3, 5), Some(20.0), None),
            stored(3, ymd(2024, 3, 6), None, Some(50)),
            stored(4, ymd(2024, 3, 12), None, None),
        ];

        let points = ResampleEngine::resample(&bars, PriceColumn::Close, Frequency::Weekly);
        assert_eq!(points.len(), 2);

        assert_eq!(points[0].date, ymd(2024, 3, 10));
        assert_eq!(points[0].value, Some(15.0));
        assert_eq!(points[0].volume, 150);
        assert_eq!(points[0].rows, 3);

        assert_eq!(points[1].date, ymd(2024, 3, 17));
        assert_eq!(points[1].value, None);
        assert_eq!(points[1].volume, 0);
    }

    #[test]
    fn test_daily_merges_duplicate_dates() {
        let bars = vec![
            stored(1, ymd(2024, 3, 5), Some(1.0), Some(1)),
            stored(2, ymd(2024, 3, 5), Some(3.0), Some(2)),
        ];
        let points = ResampleEngine::resample(&bars, PriceColumn::Close, Frequency::Daily);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, Some(2.0));
        assert_eq!(points[0].volume, 3);
    }

    #[test]
    fn test_gap_months_not_filled() {
        let bars = vec![
            stored(1, ymd(2024, 1, 15), Some(1.0), Some(10)),
            stored(2, ymd(2024, 4, 2), Some(2.0), Some(20)),
        ];
        let points = ResampleEngine::resample(&bars, PriceColumn::Close, Frequency::Monthly);
        let labels: Vec<_> = points.iter().map(|p| p.date).collect();
        assert_eq!(labels, vec![ymd(2024, 1, 1), ymd(2024, 4, 1)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(ResampleEngine::resample(&[], PriceColumn::Open, Frequency::Monthly).is_empty());
    }
}
