//! Source readers: spreadsheet workbooks and CSV exports -> `RawTable`.
//!
//! Readers do no interpretation beyond cell typing; everything else is the
//! normalizer's job. A missing file is `SourceNotFound` and nothing is loaded.

use std::fs;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::info;

use crate::domain::{RawCell, RawTable};
use crate::error::EtlError;

/// Supported source formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Workbook),
            _ => None,
        }
    }
}

/// Read a source file. `sheet` is only used for workbooks.
pub fn read_source(path: &Path, sheet: &str) -> Result<RawTable, EtlError> {
    if !path.is_file() {
        return Err(EtlError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let format = SourceFormat::from_path(path).ok_or_else(|| EtlError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let table = match format {
        SourceFormat::Csv => read_csv(&fs::read(path)?)?,
        SourceFormat::Workbook => read_workbook(path, sheet)?,
    };

    info!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "read source"
    );
    Ok(table)
}

/// Parse CSV bytes. The delimiter (`,` or `;`) is sniffed from the header line.
///
/// Fields are decoded lossily: a cell that is not valid UTF-8 (Latin-1 exports)
/// keeps its readable part instead of failing the read.
pub fn read_csv(bytes: &[u8]) -> Result<RawTable, EtlError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .delimiter(sniff_delimiter(bytes))
        .from_reader(bytes);

    let headers = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let mut table = RawTable::new(headers);

    for record in reader.byte_records() {
        let record = record?;
        table.rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(String::from_utf8_lossy(field).into_owned())
                    }
                })
                .collect(),
        );
    }
    Ok(table)
}

fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let semis = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    if semis > commas { b';' } else { b',' }
}

fn read_workbook(path: &Path, sheet: &str) -> Result<RawTable, EtlError> {
    let spreadsheet_err = |message: String| EtlError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_err(e.to_string()))?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(EtlError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| spreadsheet_err(e.to_string()))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|row| {
            row.iter()
                .map(|cell| convert_cell(cell).to_text().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    let mut table = RawTable::new(headers);
    table.rows = rows.map(|row| row.iter().map(convert_cell).collect()).collect();
    Ok(table)
}

fn convert_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            // Time-only cells are day fractions; keep them numeric for the time parser.
            if serial < 1.0 {
                return RawCell::Number(serial);
            }
            dt.as_datetime()
                .map(RawCell::DateTime)
                .unwrap_or(RawCell::Number(serial))
        }
    }
}
