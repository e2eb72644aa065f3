// ==========================================
// 行情数据导入系统 - 字段映射器
// ==========================================
// 职责: 原始行 → PriceBar（别名查找 + 类型转换）
// 红线:
// - 日期无效 → 丢弃该行（Ok(None)），不中断导入
// - 小数损坏 → 类型转换错误，中断导入
// ==========================================

use crate::domain::price_bar::PriceBar;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::FieldNormalizer;
use crate::importer::raw_record::{RawRecord, RawValue};
use chrono::NaiveDate;

// ==========================================
// 列名别名表（按优先级排列，首个非空者生效）
// ==========================================
pub mod aliases {
    pub const DATE: &[&str] = &["Date", "date"];
    pub const OPEN: &[&str] = &["Open"];
    pub const HIGH: &[&str] = &["High"];
    pub const LOW: &[&str] = &["Low"];
    pub const CLOSE: &[&str] = &["Close"];
    pub const ADJ_CLOSE: &[&str] = &["Adj Close", "AdjClose", "adj_close"];
    pub const VOLUME: &[&str] = &["Volume"];
}

pub struct FieldMapper {
    normalizer: FieldNormalizer,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            normalizer: FieldNormalizer,
        }
    }

    /// 将原始行映射为 PriceBar
    ///
    /// # 返回
    /// - Ok(Some(PriceBar)): 映射成功
    /// - Ok(None): 日期缺失或无效，行被丢弃
    /// - Err: 数值字段存在但无法解析
    pub fn map_to_price_bar<R: RawRecord + ?Sized>(
        &self,
        record: &R,
    ) -> ImportResult<Option<PriceBar>> {
        // 数值字段先于丢弃判定解析: 损坏的小数即使出现在无日期行中也中断导入
        let date = self.resolve_date(record);
        let open = self.parse_decimal(record, aliases::OPEN)?;
        let high = self.parse_decimal(record, aliases::HIGH)?;
        let low = self.parse_decimal(record, aliases::LOW)?;
        let close = self.parse_decimal(record, aliases::CLOSE)?;
        let adj_close = self.parse_decimal(record, aliases::ADJ_CLOSE)?;
        let volume = self.parse_integer(record, aliases::VOLUME);

        Ok(date.map(|date| PriceBar {
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume,
        }))
    }

    /// 日期: 主别名解析失败时再尝试后备别名
    fn resolve_date<R: RawRecord + ?Sized>(&self, record: &R) -> Option<NaiveDate> {
        aliases::DATE.iter().find_map(|alias| {
            lookup_value(record, alias).and_then(|v| self.normalizer.resolve_date(v))
        })
    }

    fn parse_decimal<R: RawRecord + ?Sized>(
        &self,
        record: &R,
        candidates: &[&str],
    ) -> ImportResult<Option<f64>> {
        let Some((field, value)) = first_present(record, candidates) else {
            return Ok(None);
        };

        self.normalizer
            .resolve_decimal(value)
            .map_err(|e| ImportError::TypeConversionError {
                row: record.row_number(),
                field: field.to_string(),
                message: e.to_string(),
            })
    }

    fn parse_integer<R: RawRecord + ?Sized>(&self, record: &R, candidates: &[&str]) -> Option<i64> {
        first_present(record, candidates).and_then(|(_, v)| self.normalizer.resolve_integer(v))
    }
}

/// 取值（非空才返回）
fn lookup_value<'r, R: RawRecord + ?Sized>(record: &'r R, alias: &str) -> Option<&'r RawValue> {
    record.get(alias).filter(|v| !v.is_blank())
}

/// 按别名顺序查找第一个非空值
fn first_present<'r, 'a, R: RawRecord + ?Sized>(
    record: &'r R,
    candidates: &[&'a str],
) -> Option<(&'a str, &'r RawValue)> {
    candidates
        .iter()
        .find_map(|alias| lookup_value(record, alias).map(|v| (*alias, v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::raw_record::{HeaderIndex, IndexedRecord};
    use std::collections::HashMap;
    use std::rc::Rc;

    fn dict(pairs: &[(&str, &str)]) -> HashMap<String, RawValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::Text(v.to_string())))
            .collect()
    }

    fn csv_row(headers: &[&str], values: &[&str]) -> IndexedRecord {
        let index = Rc::new(HeaderIndex::new(headers.iter().copied()));
        let values = values
            .iter()
            .map(|v| RawValue::Text(v.to_string()))
            .collect();
        IndexedRecord::new(index, values, 2)
    }

    #[test]
    fn test_map_full_row() {
        let row = dict(&[
            ("Date", "2024-03-05"),
            ("Open", "10.5"),
            ("High", "11"),
            ("Low", "9,75"),
            ("Close", "1,010.25"),
            ("Adj Close", "1,000.00"),
            ("Volume", "1,200,300"),
        ]);

        let bar = FieldMapper::new().map_to_price_bar(&row).unwrap().unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(bar.open, Some(10.5));
        assert_eq!(bar.high, Some(11.0));
        assert_eq!(bar.low, Some(9.75));
        assert_eq!(bar.close, Some(1010.25));
        assert_eq!(bar.adj_close, Some(1000.0));
        assert_eq!(bar.volume, Some(1_200_300));
    }

    #[test]
    fn test_missing_date_drops_row() {
        let row = dict(&[("Open", "10"), ("Close", "11")]);
        assert_eq!(FieldMapper::new().map_to_price_bar(&row).unwrap(), None);

        let row = dict(&[("Date", "yesterday"), ("Close", "11")]);
        assert_eq!(FieldMapper::new().map_to_price_bar(&row).unwrap(), None);
    }

    #[test]
    fn test_lowercase_date_fallback() {
        let row = dict(&[("Date", "garbage"), ("date", "Mar 5, 2024")]);
        let bar = FieldMapper::new().map_to_price_bar(&row).unwrap().unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_empty_numerics_become_none() {
        let row = dict(&[
            ("Date", "05/03/2024"),
            ("Open", ""),
            ("High", " "),
            ("Volume", ""),
        ]);
        let bar = FieldMapper::new().map_to_price_bar(&row).unwrap().unwrap();
        assert_eq!(
            bar,
            PriceBar::empty(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
    }

    #[test]
    fn test_adj_close_alias_priority() {
        let row = dict(&[
            ("Date", "2024-03-05"),
            ("Adj Close", ""),
            ("AdjClose", "12.5"),
            ("adj_close", "99"),
        ]);
        let bar = FieldMapper::new().map_to_price_bar(&row).unwrap().unwrap();
        assert_eq!(bar.adj_close, Some(12.5));
    }

    #[test]
    fn test_decorated_headers_match() {
        let plain = csv_row(&["Date", "Open", "Close"], &["2024-03-05", "10", "11"]);
        let decorated = csv_row(&["Date*", "Open*", " Close** "], &["2024-03-05", "10", "11"]);

        let mapper = FieldMapper::new();
        assert_eq!(
            mapper.map_to_price_bar(&plain).unwrap(),
            mapper.map_to_price_bar(&decorated).unwrap()
        );
    }

    #[test]
    fn test_headers_are_case_sensitive() {
        let row = dict(&[("Date", "2024-03-05"), ("OPEN", "10")]);
        let bar = FieldMapper::new().map_to_price_bar(&row).unwrap().unwrap();
        assert_eq!(bar.open, None);
    }

    #[test]
    fn test_malformed_decimal_is_error() {
        let row = csv_row(&["Date", "Close"], &["2024-03-05", "12..x"]);
        let err = FieldMapper::new().map_to_price_bar(&row).unwrap_err();
        match err {
            ImportError::TypeConversionError { row, field, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "Close");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_decimal_in_undated_row_is_still_error() {
        let row = csv_row(&["Date", "Open"], &["", "abc"]);
        assert!(FieldMapper::new().map_to_price_bar(&row).is_err());
    }

    #[test]
    fn test_malformed_volume_is_absent() {
        let row = dict(&[("Date", "2024-03-05"), ("Volume", "n/a")]);
        let bar = FieldMapper::new().map_to_price_bar(&row).unwrap().unwrap();
        assert_eq!(bar.volume, None);
    }
}
