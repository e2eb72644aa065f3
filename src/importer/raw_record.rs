// ==========================================
// 行情数据导入系统 - 原始行抽象
// ==========================================
// 职责: 统一 CSV 行与 Excel 行的取值接口
// 约定: 字段映射器只依赖 RawRecord::get，不感知源格式
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// 表头保留标记字符（源文件中用于标注的装饰符）
pub const HEADER_MARKER: char = '*';

static EMPTY_VALUE: RawValue = RawValue::Empty;

// ==========================================
// RawValue - 原始单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
    Integer(i64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl RawValue {
    /// 空值判定: Empty 或去除空白后为空的文本
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Empty => Ok(()),
            RawValue::Text(s) => write!(f, "{}", s),
            RawValue::Number(v) => write!(f, "{}", v),
            RawValue::Integer(v) => write!(f, "{}", v),
            RawValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            RawValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// ==========================================
// RawRecord Trait
// ==========================================
// 实现者: CsvRecord, SheetRecord
pub trait RawRecord {
    /// 按（已规范化的）表头名取值
    ///
    /// # 返回
    /// - Some(&RawValue): 表头存在
    /// - None: 表头不存在
    fn get(&self, header: &str) -> Option<&RawValue>;

    /// 源文件中的行号（用于错误定位）
    fn row_number(&self) -> usize;
}

/// 规范化表头: 去除标记字符与首尾空白
pub fn normalize_header(raw: &str) -> String {
    raw.replace(HEADER_MARKER, "").trim().to_string()
}

// ==========================================
// HeaderIndex - 表头 → 列号索引
// ==========================================
// 同名表头以首次出现的列为准
#[derive(Debug, Default)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
    names: Vec<String>,
}

impl HeaderIndex {
    pub fn new<I, S>(raw_headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = HashMap::new();
        let mut names = Vec::new();
        for (idx, raw) in raw_headers.into_iter().enumerate() {
            let name = normalize_header(raw.as_ref());
            columns.entry(name.clone()).or_insert(idx);
            names.push(name);
        }
        Self { columns, names }
    }

    pub fn position(&self, header: &str) -> Option<usize> {
        self.columns.get(header).copied()
    }

    /// 规范化后的表头（按源顺序）
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ==========================================
// IndexedRecord - 基于共享表头索引的行
// ==========================================
// CSV 与 Excel 适配器共用此结构，值按列号存放
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    headers: Rc<HeaderIndex>,
    values: Vec<RawValue>,
    row_number: usize,
}

impl IndexedRecord {
    pub fn new(headers: Rc<HeaderIndex>, values: Vec<RawValue>, row_number: usize) -> Self {
        Self {
            headers,
            values,
            row_number,
        }
    }

    /// 整行是否全部为空
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(RawValue::is_blank)
    }
}

impl RawRecord for IndexedRecord {
    fn get(&self, header: &str) -> Option<&RawValue> {
        // 列缺失（行比表头短）视为空值，与表头不存在区分
        self.headers
            .position(header)
            .map(|idx| self.values.get(idx).unwrap_or(&EMPTY_VALUE))
    }

    fn row_number(&self) -> usize {
        self.row_number
    }
}

/// CSV 行
pub type CsvRecord = IndexedRecord;

/// Excel 行
pub type SheetRecord = IndexedRecord;

// 内存数据源使用的字典行
//
// 键同样按表头规则规整后匹配；多个键规整后相同时取字典序最小者。
impl RawRecord for HashMap<String, RawValue> {
    fn get(&self, header: &str) -> Option<&RawValue> {
        HashMap::get(self, header).or_else(|| {
            self.iter()
                .filter(|(key, _)| normalize_header(key) == header)
                .min_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, value)| value)
        })
    }

    fn row_number(&self) -> usize {
        0
    }
}
