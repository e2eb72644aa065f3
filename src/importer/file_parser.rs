// ==========================================
// 行情数据导入系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 约定:
// - 按源顺序惰性产出原始行，单次遍历
// - CSV 先以 UTF-8 校验整份文件，失败则从头以后备编码重读
// - Excel 只读第一个工作表
// - 完全空白的行直接跳过
// ==========================================

use crate::domain::types::SourceFormat;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::raw_record::{CsvRecord, HeaderIndex, IndexedRecord, RawValue, SheetRecord};
use calamine::{open_workbook, Data, Range, Reader, Sheets, Xls, XlsError, Xlsx, XlsxError};
use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::{DecoderResult, Encoding, UTF_8};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// 编码校验时的读块大小
const SCAN_CHUNK_BYTES: usize = 8 * 1024;

// ==========================================
// 编码探测
// ==========================================

/// 选择能完整解码文件的编码: 先 UTF-8，再后备编码
pub fn detect_encoding(
    path: &Path,
    fallback: &'static Encoding,
) -> ImportResult<&'static Encoding> {
    if decodes_cleanly(path, UTF_8)? {
        return Ok(UTF_8);
    }

    warn!(
        file_path = %path.display(),
        fallback = fallback.name(),
        "UTF-8 解码失败，改用后备编码重读"
    );

    if decodes_cleanly(path, fallback)? {
        Ok(fallback)
    } else {
        Err(ImportError::EncodingError {
            encoding: fallback.name().to_string(),
            message: format!("文件无法以 UTF-8 或 {} 解码", fallback.name()),
        })
    }
}

/// 流式校验整个文件能否无损解码
fn decodes_cleanly(path: &Path, encoding: &'static Encoding) -> ImportResult<bool> {
    let mut file = File::open(path)?;
    let mut decoder = encoding.new_decoder_with_bom_removal();
    let mut buf = vec![0u8; SCAN_CHUNK_BYTES];
    let mut out = String::with_capacity(SCAN_CHUNK_BYTES * 3 + 16);

    loop {
        let n = file.read(&mut buf)?;
        let last = n == 0;
        let mut src = &buf[..n];

        loop {
            out.clear();
            let (result, read) = decoder.decode_to_string_without_replacement(src, &mut out, last);
            src = &src[read..];
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => out.reserve(src.len() * 3 + 16),
                DecoderResult::Malformed(_, _) => return Ok(false),
            }
        }

        if last {
            return Ok(true);
        }
    }
}

// ==========================================
// CsvSource - CSV 惰性行源
// ==========================================
pub struct CsvSource {
    reader: csv::Reader<File>,
    headers: Rc<HeaderIndex>,
    encoding: &'static Encoding,
    buffer: ByteRecord,
}

impl CsvSource {
    /// 打开 CSV 文件（自动选择编码）
    pub fn open(path: &Path, fallback: &'static Encoding) -> ImportResult<Self> {
        let encoding = detect_encoding(path, fallback)?;
        Self::open_with_encoding(path, encoding)
    }

    pub fn open_with_encoding(path: &Path, encoding: &'static Encoding) -> ImportResult<Self> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let raw_headers = reader
            .byte_headers()?
            .iter()
            .map(|h| decode_field(h, encoding))
            .collect::<ImportResult<Vec<String>>>()?;
        let headers = Rc::new(HeaderIndex::new(raw_headers));

        debug!(
            encoding = encoding.name(),
            columns = ?headers.names(),
            "CSV 表头读取完成"
        );

        Ok(Self {
            reader,
            headers,
            encoding,
            buffer: ByteRecord::new(),
        })
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn headers(&self) -> &HeaderIndex {
        &self.headers
    }

    fn decode_current(&self) -> ImportResult<Vec<RawValue>> {
        self.buffer
            .iter()
            .map(|field| decode_field(field, self.encoding).map(RawValue::Text))
            .collect()
    }
}

impl Iterator for CsvSource {
    type Item = ImportResult<CsvRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_byte_record(&mut self.buffer) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }

            let row_number = self
                .buffer
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or_default();

            let values = match self.decode_current() {
                Ok(values) => values,
                Err(e) => return Some(Err(e)),
            };

            let record = IndexedRecord::new(Rc::clone(&self.headers), values, row_number);
            // 跳过完全空白的行
            if record.is_blank() {
                continue;
            }
            return Some(Ok(record));
        }
    }
}

fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> ImportResult<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(ImportError::EncodingError {
            encoding: encoding.name().to_string(),
            message: "字段包含非法字节序列".to_string(),
        });
    }
    Ok(text.into_owned())
}

// ==========================================
// SheetSource - Excel 惰性行源
// ==========================================
pub struct SheetSource {
    range: Range<Data>,
    headers: Rc<HeaderIndex>,
    next_row: usize,
    first_row_number: usize,
}

impl SheetSource {
    /// 打开 Excel 文件的第一个工作表
    pub fn open(path: &Path) -> ImportResult<Self> {
        let mut workbook = open_sheets(path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        debug!(sheet = %sheet_name, total_sheets = sheet_names.len(), "读取第一个工作表");

        let range = workbook.worksheet_range(&sheet_name)?;
        Self::from_range(range)
    }

    /// 从已加载的单元格区域构造（首行为表头）
    pub fn from_range(range: Range<Data>) -> ImportResult<Self> {
        let (height, width) = range.get_size();
        if height == 0 {
            return Err(ImportError::ExcelParseError("Excel 文件无数据行".to_string()));
        }

        let headers = (0..width).map(|col| match range.get((0, col)) {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Empty) | None => String::new(),
            Some(other) => other.to_string(),
        });
        let headers = Rc::new(HeaderIndex::new(headers));

        // 工作表行号从 1 开始；表头所在行为区域起始行
        let first_row_number = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

        Ok(Self {
            range,
            headers,
            next_row: 1,
            first_row_number,
        })
    }

    pub fn headers(&self) -> &HeaderIndex {
        &self.headers
    }
}

impl Iterator for SheetSource {
    type Item = ImportResult<SheetRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let (height, width) = self.range.get_size();

        while self.next_row < height {
            let row = self.next_row;
            self.next_row += 1;

            let values = (0..width)
                .map(|col| self.range.get((row, col)).map(cell_to_raw).unwrap_or(RawValue::Empty))
                .collect();
            let record = IndexedRecord::new(
                Rc::clone(&self.headers),
                values,
                self.first_row_number + row,
            );

            // 跳过完全空白的行
            if record.is_blank() {
                continue;
            }
            return Some(Ok(record));
        }
        None
    }
}

/// 按扩展名（不区分大小写）打开工作簿
fn open_sheets(path: &Path) -> ImportResult<Sheets<BufReader<File>>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xlsx" => {
            let workbook: Xlsx<_> = open_workbook(path)
                .map_err(|e: XlsxError| ImportError::ExcelParseError(e.to_string()))?;
            Ok(Sheets::Xlsx(workbook))
        }
        "xls" => {
            let workbook: Xls<_> = open_workbook(path)
                .map_err(|e: XlsError| ImportError::ExcelParseError(e.to_string()))?;
            Ok(Sheets::Xls(workbook))
        }
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

/// 单元格 → 原始值
///
/// 日期单元格交给 calamine 换算（含 1904 日期系统）；时长单元格按数值处理。
pub fn cell_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Float(f) => RawValue::Number(*f),
        Data::Int(i) => RawValue::Integer(*i),
        Data::Bool(b) => RawValue::Text(b.to_string()),
        Data::DateTime(dt) if dt.is_duration() => RawValue::Number(dt.as_f64()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(RawValue::DateTime)
            .unwrap_or(RawValue::Empty),
        other => RawValue::Text(other.to_string()),
    }
}

// ==========================================
// RecordSource - 统一行源
// ==========================================
pub enum RecordSource {
    Csv(CsvSource),
    Excel(SheetSource),
}

impl RecordSource {
    pub fn format(&self) -> SourceFormat {
        match self {
            RecordSource::Csv(_) => SourceFormat::Csv,
            RecordSource::Excel(_) => SourceFormat::Excel,
        }
    }
}

impl Iterator for RecordSource {
    type Item = ImportResult<IndexedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RecordSource::Csv(source) => source.next(),
            RecordSource::Excel(source) => source.next(),
        }
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser {
    fallback_encoding: &'static Encoding,
}

impl UniversalFileParser {
    pub fn new(fallback_encoding: &'static Encoding) -> Self {
        Self { fallback_encoding }
    }

    pub fn open<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RecordSource> {
        let path = file_path.as_ref();

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let format = SourceFormat::from_path(path).ok_or_else(|| {
            ImportError::UnsupportedFormat(
                path.extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default(),
            )
        })?;

        info!(file_path = %path.display(), format = %format, "打开源文件");

        match format {
            SourceFormat::Csv => Ok(RecordSource::Csv(CsvSource::open(
                path,
                self.fallback_encoding,
            )?)),
            SourceFormat::Excel => Ok(RecordSource::Excel(SheetSource::open(path)?)),
        }
    }
}
