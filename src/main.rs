// ==========================================
// 行情数据导入系统 - 命令行入口
// ==========================================
// 用法: price-ingest <FILE> [--db PATH] [--batch-size N] [--fallback-encoding LABEL] [--table NAME]
// 退出码: 0 成功；参数错误由 clap 输出用法并退出；其他失败输出诊断与提示
// ==========================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use price_ingest::config::ConfigOverrides;
use price_ingest::db::resolve_db_path;
use price_ingest::importer::ImportError;
use price_ingest::repository::RepositoryError;
use price_ingest::{logging, ImportRun, PriceImporter};

/// 将 CSV / Excel 行情文件导入 SQLite
#[derive(Parser)]
#[command(name = "price-ingest")]
#[command(about = "Load OHLC price files (.csv/.xlsx/.xls) into the price table")]
#[command(version)]
struct Cli {
    /// 行情文件（.csv / .xlsx / .xls）
    file: PathBuf,

    /// 数据库文件路径（默认: PRICE_INGEST_DB_PATH 或用户数据目录）
    #[arg(long)]
    db: Option<PathBuf>,

    /// 每批提交的行数
    #[arg(long)]
    batch_size: Option<usize>,

    /// UTF-8 解码失败时使用的回退编码（WHATWG 标签）
    #[arg(long)]
    fallback_encoding: Option<String>,

    /// 目标表名（默认 yahoo_data）
    #[arg(long)]
    table: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    tracing::info!("{} v{}", price_ingest::APP_NAME, price_ingest::VERSION);

    match run(&cli) {
        Ok(run) => {
            println!("Import finished, total rows: {}", run.accepted);
            if run.rejected > 0 {
                println!("Skipped rows without a valid date: {}", run.rejected);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("导入失败: {:#}", err);
            for hint in hints(&err) {
                eprintln!("  提示: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ImportRun> {
    let db_path = resolve_db_path(cli.db.as_deref());
    tracing::info!(db_path = %db_path.display(), "使用数据库");

    let overrides = ConfigOverrides {
        batch_size: cli.batch_size,
        fallback_encoding: cli.fallback_encoding.clone(),
        table_name: cli.table.clone(),
    };

    let mut importer = PriceImporter::open(&db_path, &overrides)
        .with_context(|| format!("无法初始化导入 (数据库 {})", db_path.display()))?;

    importer
        .import_file_with_progress(&cli.file, |total| {
            println!("Imported {} rows", total);
        })
        .with_context(|| format!("文件 {}", cli.file.display()))
}

fn hints(err: &anyhow::Error) -> Vec<&'static str> {
    let Some(import_err) = err.downcast_ref::<ImportError>() else {
        return vec!["使用 RUST_LOG=debug 查看详细日志"];
    };

    match import_err {
        ImportError::FileNotFound(_) => vec!["检查文件路径是否正确"],
        ImportError::UnsupportedFormat(_) => vec!["仅支持 .csv / .xlsx / .xls 文件"],
        ImportError::FileReadError(_) => vec!["检查文件是否存在且有读取权限"],
        ImportError::ExcelParseError(_) => vec!["确认文件未损坏，且第一个工作表包含表头行"],
        ImportError::CsvParseError(_) => vec!["检查 CSV 的引号与分隔符"],
        ImportError::EncodingError { .. } => {
            vec!["使用 --fallback-encoding 指定其他编码，例如 windows-1252"]
        }
        ImportError::TypeConversionError { .. } => vec![
            "修正该行的数值字段后重新导入",
            "之前已提交的批次不会回滚，重新导入会追加数据",
        ],
        ImportError::ConfigValueError { .. } => vec![
            "检查 config_kv 表、PRICE_INGEST_* 环境变量与命令行参数",
        ],
        ImportError::Repository(RepositoryError::InvalidTableName(_)) => {
            vec!["表名只允许字母、数字与下划线"]
        }
        ImportError::Repository(_) => vec![
            "检查数据库路径是否正确 (--db 或 PRICE_INGEST_DB_PATH)",
            "检查数据库文件及目录的写权限",
        ],
    }
}
