//! Shared domain types.
//!
//! Raw input is kept deliberately loose (`RawCell`) so every reader (spreadsheet,
//! CSV, SQLite store) can hand the normalizer the same shape. Normalized rows are
//! strictly typed and serializable so they can be exported as-is.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Canonical column holding the incident date.
pub const COL_DATE: &str = "Date";
/// Canonical column holding the free-text time of day.
pub const COL_TIME: &str = "Heure";
/// Canonical column holding the incident type.
pub const COL_CATEGORY: &str = "Type d’incident";
/// Canonical column holding the monetary value.
pub const COL_VALUE: &str = "Prix";
/// Derived column: date + parsed time.
pub const COL_TIMESTAMP: &str = "DateHeure";

/// Incident type counted as critical by default.
pub const DEFAULT_CRITICAL_LABEL: &str = "Vol confirmé";

/// A single untyped cell as read from a source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl RawCell {
    /// Text rendering used for passthrough fields and free-text columns.
    ///
    /// Blank text is treated like an empty cell.
    pub fn to_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() { None } else { Some(s.clone()) }
            }
            RawCell::Number(v) => Some(format_number(*v)),
            RawCell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// A header row plus data rows, in source file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Cell at `(row, col)`; short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        static EMPTY: RawCell = RawCell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

/// One normalized incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentRecord {
    /// 1-based row position in the source (header excluded).
    pub source_row: usize,
    pub date: NaiveDate,
    /// Time of day as written in the source (trimmed).
    pub time: String,
    /// Leniently parsed `time`.
    pub time_of_day: Option<NaiveTime>,
    /// `date` combined with `time_of_day`.
    pub timestamp: Option<NaiveDateTime>,
    pub category: Option<String>,
    pub value: f64,
    /// Passthrough cells, aligned with `Dataset::passthrough_columns()`.
    pub extra: Vec<Option<String>>,
}

impl IncidentRecord {
    pub fn is_category(&self, label: &str) -> bool {
        self.category.as_deref() == Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_cell_text_rendering() {
        assert_eq!(RawCell::Empty.to_text(), None);
        assert_eq!(RawCell::Text("   ".to_string()).to_text(), None);
        assert_eq!(RawCell::Text(" Porte B ".to_string()).to_text(), Some(" Porte B ".to_string()));
        assert_eq!(RawCell::Number(42.0).to_text(), Some("42".to_string()));
        assert_eq!(RawCell::Number(12.5).to_text(), Some("12.5".to_string()));
    }

    #[test]
    fn short_rows_read_as_empty() {
        let mut table = RawTable::new(vec!["A".to_string(), "B".to_string()]);
        table.rows.push(vec![RawCell::Text("x".to_string())]);
        assert_eq!(table.cell(0, 1), &RawCell::Empty);
        assert_eq!(table.cell(5, 0), &RawCell::Empty);
    }
}
