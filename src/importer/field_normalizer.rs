// ==========================================
// 行情数据导入系统 - 字段标准化器
// ==========================================
// 职责: 原始值 → 标准日期 / 浮点数 / 整数
// 约定:
// - 缺失或不可解析 → None（不是错误）
// - 例外: 非空但损坏的小数 → MalformedDecimal（致命，由调用方中止导入）
// ==========================================

use crate::importer::raw_record::RawValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

/// 日期文本格式，按顺序尝试
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%b %d, %Y", "%d/%m/%Y"];

const NBSP: char = '\u{00A0}';

/// 非空但无法解析的小数
#[derive(Error, Debug, Clone, PartialEq)]
#[error("无法解析为浮点数: {value}")]
pub struct MalformedDecimal {
    pub value: String,
}

pub struct FieldNormalizer;

impl FieldNormalizer {
    // ==========================================
    // 日期
    // ==========================================

    /// 解析日期（丢弃时间部分）
    ///
    /// # 返回
    /// - Some(NaiveDate): 任一格式解析成功
    /// - None: 空值或全部格式失败
    pub fn resolve_date(&self, value: &RawValue) -> Option<NaiveDate> {
        match value {
            RawValue::Date(d) => Some(*d),
            RawValue::DateTime(dt) => Some(dt.date()),
            RawValue::Text(s) => self.parse_date_text(s),
            RawValue::Empty | RawValue::Number(_) | RawValue::Integer(_) => None,
        }
    }

    pub fn parse_date_text(&self, raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }

        // 兜底: 取首个空白前的部分按 ISO 解析
        let head = s.split_whitespace().next()?;
        parse_iso_prefix(head)
    }

    // ==========================================
    // 小数
    // ==========================================

    /// 解析小数（兼容欧式 / 英式千分位）
    ///
    /// # 返回
    /// - Ok(Some(f64)): 解析成功
    /// - Ok(None): 空值
    /// - Err(MalformedDecimal): 非空但无法解析
    pub fn resolve_decimal(&self, value: &RawValue) -> Result<Option<f64>, MalformedDecimal> {
        match value {
            RawValue::Empty => Ok(None),
            RawValue::Number(v) => Ok(Some(*v)),
            RawValue::Integer(v) => Ok(Some(*v as f64)),
            RawValue::Text(s) => self.parse_decimal_text(s),
            RawValue::Date(_) | RawValue::DateTime(_) => Err(MalformedDecimal {
                value: value.to_string(),
            }),
        }
    }

    pub fn parse_decimal_text(&self, raw: &str) -> Result<Option<f64>, MalformedDecimal> {
        let s = strip_spaces(raw);
        if s.is_empty() {
            return Ok(None);
        }

        let normalized = if comma_is_decimal_separator(&s) {
            // 33.795,70 -> 33795.70
            s.replace('.', "").replace(',', ".")
        } else {
            // 33,795.70 / 33795.70 -> 33795.70
            s.replace(',', "")
        };

        match normalized.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(MalformedDecimal {
                value: raw.trim().to_string(),
            }),
        }
    }

    // ==========================================
    // 整数
    // ==========================================

    /// 解析整数（逗号一律视为千分位）
    ///
    /// 整数解析失败时按浮点数解析并向零截断；仍失败则返回 None
    pub fn resolve_integer(&self, value: &RawValue) -> Option<i64> {
        match value {
            RawValue::Empty => None,
            RawValue::Integer(v) => Some(*v),
            RawValue::Number(v) => truncate_to_i64(*v),
            RawValue::Text(s) => self.parse_integer_text(s),
            RawValue::Date(_) | RawValue::DateTime(_) => None,
        }
    }

    pub fn parse_integer_text(&self, raw: &str) -> Option<i64> {
        let s = strip_spaces(raw).replace(',', "");
        if s.is_empty() {
            return None;
        }

        s.parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().and_then(truncate_to_i64))
    }
}

/// 去除首尾空白，并移除内部的不换行空格与普通空格
fn strip_spaces(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != NBSP && *c != ' ').collect()
}

/// 逗号是否作为小数点
///
/// 含逗号且无句点，或最后一个逗号位于最后一个句点之后（欧式写法）
fn comma_is_decimal_separator(s: &str) -> bool {
    match (s.rfind(','), s.rfind('.')) {
        (Some(_), None) => true,
        (Some(comma), Some(period)) => comma > period,
        _ => false,
    }
}

fn truncate_to_i64(v: f64) -> Option<i64> {
    // i64::MAX as f64 == 2^63，不在 i64 范围内
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

fn parse_iso_prefix(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y%m%d").ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_three_date_forms_agree() {
        let n = FieldNormalizer;
        let expected = Some(ymd(2024, 3, 5));
        assert_eq!(n.resolve_date(&text("2024-03-05")), expected);
        assert_eq!(n.resolve_date(&text("Mar 5, 2024")), expected);
        assert_eq!(n.resolve_date(&text("05/03/2024")), expected);
    }

    #[test]
    fn test_date_iso_prefix_discards_time() {
        let n = FieldNormalizer;
        assert_eq!(
            n.resolve_date(&text("2024-03-05 16:00:00")),
            Some(ymd(2024, 3, 5))
        );
        assert_eq!(
            n.resolve_date(&text("2024-03-05T09:30:00")),
            Some(ymd(2024, 3, 5))
        );
        assert_eq!(
            n.resolve_date(&text("2024-03-05T09:30:00+02:00")),
            Some(ymd(2024, 3, 5))
        );
    }

    #[test]
    fn test_date_empty_or_garbage_is_absent() {
        let n = FieldNormalizer;
        assert_eq!(n.resolve_date(&RawValue::Empty), None);
        assert_eq!(n.resolve_date(&text("")), None);
        assert_eq!(n.resolve_date(&text("   ")), None);
        assert_eq!(n.resolve_date(&text("not a date")), None);
        assert_eq!(n.resolve_date(&text("2024-13-45")), None);
        assert_eq!(n.resolve_date(&RawValue::Number(45356.0)), None);
    }

    #[test]
    fn test_date_native_cells() {
        let n = FieldNormalizer;
        let dt = ymd(2024, 3, 5).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(n.resolve_date(&RawValue::DateTime(dt)), Some(ymd(2024, 3, 5)));
        assert_eq!(
            n.resolve_date(&RawValue::Date(ymd(2024, 3, 5))),
            Some(ymd(2024, 3, 5))
        );
    }

    #[test]
    fn test_decimal_european_convention() {
        let n = FieldNormalizer;
        assert_eq!(n.resolve_decimal(&text("33.795,70")), Ok(Some(33795.70)));
        assert_eq!(n.resolve_decimal(&text("12,5")), Ok(Some(12.5)));
    }

    #[test]
    fn test_decimal_english_convention() {
        let n = FieldNormalizer;
        assert_eq!(n.resolve_decimal(&text("33,795.70")), Ok(Some(33795.70)));
        assert_eq!(n.resolve_decimal(&text("33795.70")), Ok(Some(33795.70)));
        assert_eq!(n.resolve_decimal(&text("1,234,567.5")), Ok(Some(1234567.5)));
    }

    #[test]
    fn test_decimal_ambiguous_comma_kept_as_decimal() {
        let n = FieldNormalizer;
        assert_eq!(n.resolve_decimal(&text("1,234")), Ok(Some(1.234)));
    }

    #[test]
    fn test_decimal_strips_spaces() {
        let n = FieldNormalizer;
        assert_eq!(
            n.resolve_decimal(&text("\u{00A0}33 795,70 ")),
            Ok(Some(33795.70))
        );
        assert_eq!(n.resolve_decimal(&text(" \u{00A0} ")), Ok(None));
    }

    #[test]
    fn test_decimal_absent_and_native() {
        let n = FieldNormalizer;
        assert_eq!(n.resolve_decimal(&RawValue::Empty), Ok(None));
        assert_eq!(n.resolve_decimal(&text("")), Ok(None));
        assert_eq!(n.resolve_decimal(&RawValue::Number(1.25)), Ok(Some(1.25)));
        assert_eq!(n.resolve_decimal(&RawValue::Integer(7)), Ok(Some(7.0)));
    }

    #[test]
    fn test_decimal_malformed_is_error() {
        let n = FieldNormalizer;
        let err = n.resolve_decimal(&text("12abc")).unwrap_err();
        assert_eq!(err.value, "12abc");
        assert!(n.resolve_decimal(&text("n/a")).is_err());
        assert!(n.resolve_decimal(&text("NaN")).is_err());
        assert!(n.resolve_decimal(&text("1,234,567")).is_err());
    }

    #[test]
    fn test_integer_thousands_and_truncation() {
        let n = FieldNormalizer;
        assert_eq!(n.resolve_integer(&text("1,234,567")), Some(1234567));
        assert_eq!(n.resolve_integer(&text(" 12 345 ")), Some(12345));
        assert_eq!(n.resolve_integer(&text("1234.9")), Some(1234));
        assert_eq!(n.resolve_integer(&text("-7.8")), Some(-7));
        assert_eq!(n.resolve_integer(&RawValue::Number(99.99)), Some(99));
        assert_eq!(n.resolve_integer(&RawValue::Integer(42)), Some(42));
    }

    #[test]
    fn test_integer_never_fails() {
        let n = FieldNormalizer;
        assert_eq!(n.resolve_integer(&RawValue::Empty), None);
        assert_eq!(n.resolve_integer(&text("")), None);
        assert_eq!(n.resolve_integer(&text("abc")), None);
        assert_eq!(n.resolve_integer(&text("inf")), None);
        assert_eq!(n.resolve_integer(&text("1e30")), None);
    }
}
