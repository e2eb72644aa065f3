// 行情报表工具: 查看已导入数据的日期范围，输出/导出重采样序列。
//
// Usage:
//   cargo run --bin price-report -- bounds [--db PATH] [--table NAME]
//   cargo run --bin price-report -- series --start 2024-01-01 --end 2024-06-30 \
//       --freq weekly --column close [--out series.csv] [--json]

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use price_ingest::api::{write_series_csv, write_series_json, DashboardApi};
use price_ingest::db::resolve_db_path;
use price_ingest::repository::{PriceBarRepository, SqlitePriceBarRepository, DEFAULT_TABLE_NAME};
use price_ingest::{logging, Frequency, PriceColumn};

/// 已导入行情的报表工具
#[derive(Parser)]
#[command(name = "price-report")]
#[command(about = "Inspect stored price bars and export resampled series")]
#[command(version)]
struct Cli {
    /// 数据库文件路径（默认: PRICE_INGEST_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 行情表名
    #[arg(long, global = true, default_value = DEFAULT_TABLE_NAME)]
    table: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 显示已存储数据的日期范围
    Bounds,
    /// 输出指定区间的重采样序列
    Series(SeriesArgs),
}

#[derive(Args)]
struct SeriesArgs {
    /// 开始日期 (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// 结束日期 (YYYY-MM-DD)
    #[arg(long)]
    end: NaiveDate,

    /// 频率: daily / weekly / monthly
    #[arg(long, default_value = "daily")]
    freq: Frequency,

    /// 价格列: open / high / low / close / adj_close
    #[arg(long, default_value = "close")]
    column: PriceColumn,

    /// 写入文件（默认输出到 stdout）
    #[arg(long)]
    out: Option<PathBuf>,

    /// 以 JSON 输出（默认 CSV）
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("报表失败: {:#}", err);
            eprintln!("  提示: 检查数据库路径是否正确 (--db 或 PRICE_INGEST_DB_PATH)");
            eprintln!("  提示: 检查数据库文件的读取权限，并确认已执行过导入");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = resolve_db_path(cli.db.as_deref());
    let mut repo = SqlitePriceBarRepository::open(&db_path, &cli.table)
        .with_context(|| format!("无法打开数据库 {}", db_path.display()))?;
    // 未导入过的库也能给出"尚无数据"
    repo.ensure_table().context("初始化行情表失败")?;
    let api = DashboardApi::new(repo);

    match cli.command {
        Commands::Bounds => {
            match api.date_bounds().context("查询日期范围失败")? {
                Some((min, max)) => println!("{} .. {}", min, max),
                None => eprintln!("警告: 表中尚无数据 (no rows yet)"),
            }
            Ok(())
        }
        Commands::Series(args) => {
            let points = api
                .resampled_series(args.start, args.end, args.freq, args.column)
                .context("查询重采样序列失败")?;

            let writer: Box<dyn Write> = match &args.out {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path)
                        .with_context(|| format!("无法创建输出文件 {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };

            if args.json {
                write_series_json(&points, writer)?;
            } else {
                write_series_csv(&points, args.column, writer)?;
            }

            if let Some(path) = &args.out {
                eprintln!("已写出 {} 个数据点到 {}", points.len(), path.display());
            }
            Ok(())
        }
    }
}
