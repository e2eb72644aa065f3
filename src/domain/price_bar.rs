// ==========================================
// 行情数据导入系统 - 行情领域模型
// ==========================================
// 对齐: yahoo_data 表 / import_run 表
// ==========================================

use crate::domain::types::{PriceColumn, SourceFormat};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// PriceBar - 标准行（导入层输出）
// ==========================================
// 红线: date 不可为空；数值缺失保留为 None，不得补 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,          // 交易日（无时间部分）
    pub open: Option<f64>,        // 开盘价
    pub high: Option<f64>,        // 最高价
    pub low: Option<f64>,         // 最低价
    pub close: Option<f64>,       // 收盘价
    pub adj_close: Option<f64>,   // 复权收盘价
    pub volume: Option<i64>,      // 成交量
}

impl PriceBar {
    /// 仅含日期、其余字段全部缺失的行
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            volume: None,
        }
    }

    /// 按价格列取值
    pub fn price(&self, column: PriceColumn) -> Option<f64> {
        match column {
            PriceColumn::Open => self.open,
            PriceColumn::High => self.high,
            PriceColumn::Low => self.low,
            PriceColumn::Close => self.close,
            PriceColumn::AdjClose => self.adj_close,
        }
    }
}

// ==========================================
// StoredBar - 已落库行（查询层输出）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBar {
    pub id: i64, // 自增主键
    #[serde(flatten)]
    pub bar: PriceBar,
}

// ==========================================
// LoadSummary - 分批落库统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub accepted: usize, // 已写入行数
    pub rejected: usize, // 因日期无效被丢弃的行数
    pub batches: usize,  // 提交次数
}

// ==========================================
// ImportRun - 导入运行记录
// ==========================================
// 对齐: import_run 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: String,                // 运行 ID（UUID）
    pub file_name: Option<String>,     // 源文件名
    pub file_path: String,             // 源文件路径
    pub source_format: SourceFormat,   // 源文件格式
    pub accepted: usize,               // 写入行数
    pub rejected: usize,               // 丢弃行数
    pub batches: usize,                // 批次数
    pub imported_at: DateTime<Utc>,    // 完成时间
    pub elapsed_ms: u64,               // 耗时（毫秒）
}

// ==========================================
// ResampledPoint - 重采样结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledPoint {
    pub date: NaiveDate,      // 桶标签
    pub value: Option<f64>,   // 价格均值（桶内无有效价格时为 None）
    pub volume: i64,          // 成交量合计
    pub rows: usize,          // 桶内行数
}
