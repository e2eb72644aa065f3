// ==========================================
// 测试数据生成器
// ==========================================
// 用途: 生成手工验证用的行情 CSV 文件
// 输出: tests/fixtures/datasets/*.csv
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use csv::Writer;
use std::error::Error;
use std::fs::{self, File};

const OUTPUT_DIR: &str = "tests/fixtures/datasets";

// Yahoo Finance 导出的标准表头
const CSV_HEADER: &[&str] = &["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume"];

// 行情记录结构
#[derive(Clone)]
struct BarRecord {
    date: String,
    open: String,
    high: String,
    low: String,
    close: String,
    adj_close: String,
    volume: String,
}

impl BarRecord {
    fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.open.clone(),
            self.high.clone(),
            self.low.clone(),
            self.close.clone(),
            self.adj_close.clone(),
            self.volume.clone(),
        ]
    }
}

/// 第 index 个交易日（跳过周末）
fn trading_day(index: usize) -> NaiveDate {
    let mut date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default();
    let mut remaining = index;
    while remaining > 0 {
        date += Duration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    date
}

/// 确定性的价格走势（不依赖随机数，便于复现）
fn generate_normal_record(index: usize) -> BarRecord {
    let t = index as f64;
    let close = 100.0 + 10.0 * (t / 15.0).sin() + t * 0.05;
    let open = close - 0.8 * (t / 3.0).cos();
    let high = open.max(close) + 1.25;
    let low = open.min(close) - 1.10;
    let volume = 1_000_000 + (index % 17) * 25_000;

    BarRecord {
        date: trading_day(index).format("%Y-%m-%d").to_string(),
        open: format!("{:.4}", open),
        high: format!("{:.4}", high),
        low: format!("{:.4}", low),
        close: format!("{:.4}", close),
        adj_close: format!("{:.4}", close * 0.98),
        volume: volume.to_string(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("开始生成测试数据集...");
    fs::create_dir_all(OUTPUT_DIR)?;

    // 1. 生成正常数据 (250条)
    generate_normal_data()?;

    // 2. 生成大数据集 (1200条，批次 500 时恰好 3 批)
    generate_large_dataset()?;

    // 3. 生成混合格式数据
    generate_mixed_formats()?;

    // 4. 生成 windows-1252 编码数据
    generate_latin1_encoded()?;

    // 5. 生成损坏小数数据
    generate_malformed_decimal()?;

    println!("✓ 所有测试数据集生成完成！");
    Ok(())
}

fn write_records(name: &str, records: &[BarRecord]) -> Result<(), Box<dyn Error>> {
    let file = File::create(format!("{}/{}", OUTPUT_DIR, name))?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.write_record(&record.to_row())?;
    }

    wtr.flush()?;
    Ok(())
}

fn generate_normal_data() -> Result<(), Box<dyn Error>> {
    let records: Vec<_> = (0..250).map(generate_normal_record).collect();
    write_records("01_normal_data.csv", &records)?;
    println!("✓ 生成 01_normal_data.csv (250条)");
    Ok(())
}

fn generate_large_dataset() -> Result<(), Box<dyn Error>> {
    let records: Vec<_> = (0..1200).map(generate_normal_record).collect();
    write_records("02_large_dataset.csv", &records)?;
    println!("✓ 生成 02_large_dataset.csv (1200条)");
    Ok(())
}

fn generate_mixed_formats() -> Result<(), Box<dyn Error>> {
    let file = File::create(format!("{}/03_mixed_formats.csv", OUTPUT_DIR))?;
    let mut wtr = Writer::from_writer(file);

    // 表头带 * 标记，复权列使用别名
    wtr.write_record(["Date*", "Open*", "High", "Low", "Close*", "AdjClose", "Volume"])?;
    wtr.write_record(["2024-03-05", "33.795,70", "33,900.10", "33700", "33 850,25", "", "1,200,300"])?;
    wtr.write_record(["Mar 6, 2024", "10.5", "", "", "10.75", "10.70", "5000.0"])?;
    wtr.write_record(["07/03/2024", "", "", "", "", "", ""])?;
    wtr.write_record(["", "1", "2", "3", "4", "5", "6"])?;
    wtr.write_record(["not a date", "1", "2", "3", "4", "5", "6"])?;
    wtr.write_record(["2024-03-08 00:00:00", "11", "12", "10", "11.5", "11.4", "n/a"])?;

    wtr.flush()?;
    println!("✓ 生成 03_mixed_formats.csv (6条，4条有效)");
    Ok(())
}

fn generate_latin1_encoded() -> Result<(), Box<dyn Error>> {
    let text = "Date,Open,Close,Volume,Commentaire\n\
                2024-03-05,10,11,100,hausse modérée\n\
                2024-03-06,11,12,200,clôture à 12 €\n";
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
    if had_errors {
        return Err("windows-1252 无法表示部分字符".into());
    }

    fs::write(format!("{}/04_latin1_encoded.csv", OUTPUT_DIR), bytes)?;
    println!("✓ 生成 04_latin1_encoded.csv (2条，windows-1252)");
    Ok(())
}

fn generate_malformed_decimal() -> Result<(), Box<dyn Error>> {
    let mut records: Vec<_> = (0..10).map(generate_normal_record).collect();
    records[7].close = "12..5x".to_string();
    write_records("05_malformed_decimal.csv", &records)?;
    println!("✓ 生成 05_malformed_decimal.csv (第 8 条收盘价损坏)");
    Ok(())
}
