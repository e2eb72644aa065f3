// ==========================================
// 行情数据导入系统 - 序列导出
// ==========================================
// 职责: 重采样序列 → CSV (date,<列名>,volume) / JSON
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::price_bar::ResampledPoint;
use crate::domain::types::PriceColumn;
use std::io::Write;

/// 写出 CSV；价格缺失时该列留空
pub fn write_series_csv<W: Write>(
    points: &[ResampledPoint],
    column: PriceColumn,
    writer: W,
) -> ApiResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["date", column.column_name(), "volume"])?;

    for point in points {
        writer.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            point.value.map(|v| v.to_string()).unwrap_or_default(),
            point.volume.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_series_json<W: Write>(points: &[ResampledPoint], writer: W) -> ApiResult<()> {
    serde_json::to_writer_pretty(writer, points)?;
    Ok(())
}
