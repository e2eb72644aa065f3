// ==========================================
// 行情数据导入系统 - 导入层
// ==========================================
// 职责: 外部行情文件 → 规范行 → 分批落库
// 支持: Excel (首个工作表), CSV (UTF-8, 失败时回退编码)
// ==========================================

// 模块声明
pub mod batch_loader;
pub mod error;
pub mod field_mapper;
pub mod field_normalizer;
pub mod file_parser;
pub mod price_importer;
pub mod raw_record;

// 重导出核心类型
pub use batch_loader::BatchedLoader;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use field_normalizer::{FieldNormalizer, MalformedDecimal};
pub use file_parser::{CsvSource, RecordSource, SheetSource, UniversalFileParser};
pub use price_importer::PriceImporter;
pub use raw_record::{HeaderIndex, IndexedRecord, RawRecord, RawValue};
