//! Input decoding: turn files and strings into a [`BatchInput`].
//!
//! The pipeline itself starts at rows or text. This module is the decoding
//! collaborator in front of it: the first sheet of an `.xlsx` workbook,
//! CSV/TSV and JSON row arrays become [`RawRecord`]s, anything else is
//! treated as one payload per line.
//!
//! Column naming follows common spreadsheet-to-JSON exports so row joins
//! behave the same as they did in the browser tool: empty headers become
//! `__EMPTY`, `__EMPTY_1`, …; duplicate headers become `name`, `name_1`,
//! `name_2`, ….

use crate::error::BatchError;
use crate::pipeline::canonicalize::{BatchInput, CellValue, RawRecord};
use calamine::{Data, Reader, Xlsx};
use serde_json::Value;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How to interpret an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// Pick by file extension; unknown extensions are text.
    #[default]
    Auto,
    /// One payload per line.
    Text,
    /// Comma-separated rows with a header line.
    Csv,
    /// Tab-separated rows with a header line.
    Tsv,
    /// A JSON array of flat objects.
    Json,
    /// First worksheet of an Office Open XML workbook.
    Xlsx,
}

impl InputKind {
    /// Resolve [`InputKind::Auto`] from the path's extension.
    pub fn resolve(self, path: &Path) -> InputKind {
        if self != InputKind::Auto {
            return self;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => InputKind::Csv,
            Some("tsv") | Some("tab") => InputKind::Tsv,
            Some("json") => InputKind::Json,
            Some("xlsx") | Some("xlsm") => InputKind::Xlsx,
            _ => InputKind::Text,
        }
    }
}

/// Read a local file and decode it.
///
/// `kind` of [`InputKind::Auto`] is resolved from the extension.
pub async fn load_file(path: &Path, kind: InputKind) -> Result<BatchInput, BatchError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| read_error(path.to_path_buf(), e))?;
    let kind = kind.resolve(path);
    debug!(
        "Read {} bytes from {} as {:?}",
        bytes.len(),
        path.display(),
        kind
    );
    decode(&bytes, kind)
}

fn read_error(path: PathBuf, e: std::io::Error) -> BatchError {
    match e.kind() {
        std::io::ErrorKind::NotFound => BatchError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => BatchError::PermissionDenied { path },
        _ => BatchError::InvalidText {
            detail: format!("cannot read '{}': {}", path.display(), e),
        },
    }
}

/// Decode raw bytes. [`InputKind::Auto`] is treated as text.
pub fn decode(bytes: &[u8], kind: InputKind) -> Result<BatchInput, BatchError> {
    let input = match kind {
        InputKind::Xlsx => BatchInput::Records(decode_xlsx(bytes)?),
        InputKind::Csv => BatchInput::Records(decode_delimited(utf8(bytes, kind)?, b',')?),
        InputKind::Tsv => BatchInput::Records(decode_delimited(utf8(bytes, kind)?, b'\t')?),
        InputKind::Json => BatchInput::Records(decode_json(utf8(bytes, kind)?)?),
        InputKind::Text | InputKind::Auto => BatchInput::Text(utf8(bytes, kind)?.to_string()),
    };
    if let BatchInput::Records(ref rows) = input {
        info!("Decoded {} rows", rows.len());
    }
    Ok(input)
}

/// Bytes as UTF-8 text without a leading BOM.
fn utf8(bytes: &[u8], kind: InputKind) -> Result<&str, BatchError> {
    let text = std::str::from_utf8(bytes).map_err(|e| match kind {
        InputKind::Text | InputKind::Auto => BatchError::InvalidText {
            detail: format!("not valid UTF-8: {e}"),
        },
        _ => BatchError::InvalidTabular {
            row: 0,
            detail: format!("not valid UTF-8: {e}"),
        },
    })?;
    Ok(strip_bom(text))
}

fn strip_bom(text: &str) -> &str {
    text.trim_start_matches('\u{FEFF}')
}

/// Decode CSV text whose first row is the header.
pub fn decode_csv(text: &str) -> Result<Vec<RawRecord>, BatchError> {
    decode_delimited(strip_bom(text), b',')
}

/// Decode delimiter-separated rows whose first row is the header.
///
/// Short rows are padded with empty cells; cells beyond the header get
/// generated `__EMPTY…` column names.
pub fn decode_delimited(text: &str, delimiter: u8) -> Result<Vec<RawRecord>, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();
    let header = match rows.next() {
        None => return Ok(Vec::new()),
        Some(result) => result.map_err(csv_error)?,
    };

    let mut used = HashSet::new();
    let mut columns: Vec<String> = header
        .iter()
        .map(|name| unique_column(name, &mut used))
        .collect();

    let mut records = Vec::new();
    for result in rows {
        let row = result.map_err(csv_error)?;
        while columns.len() < row.len() {
            columns.push(unique_column("", &mut used));
        }
        let mut record = RawRecord::new();
        for (i, column) in columns.iter().enumerate() {
            let cell = row.get(i).map(CellValue::from).unwrap_or(CellValue::Empty);
            record.push(column.clone(), cell);
        }
        records.push(record);
    }

    debug!("CSV: {} columns, {} rows", columns.len(), records.len());
    Ok(records)
}

fn csv_error(e: csv::Error) -> BatchError {
    let row = e.position().map(|p| p.line()).unwrap_or(0);
    BatchError::InvalidTabular {
        row,
        detail: e.to_string(),
    }
}

/// Make `raw` unique among `used`, naming blank headers `__EMPTY`.
fn unique_column(raw: &str, used: &mut HashSet<String>) -> String {
    let base = if raw.trim().is_empty() {
        "__EMPTY".to_string()
    } else {
        raw.to_string()
    };
    let mut name = base.clone();
    let mut n = 0;
    while used.contains(&name) {
        n += 1;
        name = format!("{base}_{n}");
    }
    used.insert(name.clone());
    name
}

/// Decode the first worksheet of an `.xlsx` workbook.
///
/// The first row is the header. Numbers (and dates, as serial numbers) become
/// [`CellValue::Number`], error cells are empty. A workbook without sheets
/// decodes to zero rows.
pub fn decode_xlsx(bytes: &[u8]) -> Result<Vec<RawRecord>, BatchError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(xlsx_error)?;
    let range = match workbook.worksheet_range_at(0) {
        None => return Ok(Vec::new()),
        Some(result) => result.map_err(xlsx_error)?,
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let mut used = HashSet::new();
    let columns: Vec<String> = header
        .iter()
        .map(|cell| {
            let title = sheet_cell(cell);
            let title = title.as_payload_part().unwrap_or_default();
            unique_column(&title, &mut used)
        })
        .collect();

    let mut records = Vec::new();
    for row in rows {
        let mut record = RawRecord::new();
        for (column, cell) in columns.iter().zip(row) {
            record.push(column.clone(), sheet_cell(cell));
        }
        records.push(record);
    }

    debug!("XLSX: {} columns, {} rows", columns.len(), records.len());
    Ok(records)
}

fn sheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            CellValue::from(s.as_str())
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::from(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
    }
}

fn xlsx_error(e: calamine::XlsxError) -> BatchError {
    BatchError::InvalidTabular {
        row: 0,
        detail: format!("cannot read workbook: {e}"),
    }
}

/// Decode a JSON array of flat objects. Key order is column order.
///
/// Blank text decodes to zero rows.
pub fn decode_json(text: &str) -> Result<Vec<RawRecord>, BatchError> {
    let text = strip_bom(text);
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(text).map_err(|e| BatchError::InvalidTabular {
        row: e.line() as u64,
        detail: e.to_string(),
    })?;

    let Value::Array(rows) = value else {
        return Err(BatchError::InvalidTabular {
            row: 0,
            detail: "expected a top-level array of row objects".into(),
        });
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| json_row(i as u64 + 1, row))
        .collect()
}

fn json_row(row: u64, value: Value) -> Result<RawRecord, BatchError> {
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(BatchError::InvalidTabular {
                row,
                detail: format!("row is not an object: {other}"),
            });
        }
    };

    let mut record = RawRecord::new();
    for (key, cell) in map {
        let cell = match cell {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => CellValue::from(n.as_f64()),
            Value::String(s) => CellValue::from(s),
            Value::Array(_) | Value::Object(_) => {
                return Err(BatchError::InvalidTabular {
                    row,
                    detail: format!("column '{key}' holds a nested value"),
                });
            }
        };
        record.push(key, cell);
    }
    Ok(record)
}
