//! Schema normalization: `RawTable` -> `Dataset`.
//!
//! The normalizer turns a loosely-structured spreadsheet export into the strict
//! incident schema:
//!
//! - header canonicalization (trim + known synonyms, exact match otherwise)
//! - required column checks (`MissingColumn` is fatal)
//! - day-first date parsing, then forward-fill in **file order**
//! - lenient time parsing and `date + time` timestamp derivation
//! - value coercion (absent column or bad cells -> 0)
//! - a stable `(date, time)` sort, strictly after all fills
//!
//! Per-cell problems never abort the run; they are counted in `NormalizeReport`.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::dataset::{Column, Dataset, Field};
use crate::domain::{
    COL_CATEGORY, COL_DATE, COL_TIME, COL_TIMESTAMP, COL_VALUE, IncidentRecord, RawCell, RawTable,
};
use crate::error::EtlError;

pub mod cells;

pub use cells::{parse_day_first_date, parse_time_of_day};

/// Header synonyms, matched after trimming. Anything else must match exactly.
const SYNONYMS: [(&str, &str); 2] = [("prix", COL_VALUE), ("Type d'incident", COL_CATEGORY)];

const REQUIRED: [&str; 3] = [COL_DATE, COL_TIME, COL_CATEGORY];

/// Counters for recoverable defects found during one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub rows_read: usize,
    pub blank_rows_skipped: usize,
    pub dates_unparsed: usize,
    pub dates_forward_filled: usize,
    /// Rows before the first parseable date (nothing to fill from).
    pub leading_undated_dropped: usize,
    pub times_unparsed: usize,
    pub values_defaulted: usize,
    pub values_unparsed: usize,
    pub value_column_synthesized: bool,
    pub duplicate_columns: Vec<String>,
}

impl NormalizeReport {
    /// Total number of cell-level defects that were recovered.
    pub fn cell_defects(&self) -> usize {
        self.dates_unparsed + self.times_unparsed + self.values_unparsed
    }
}

/// Column positions resolved from the source header row.
#[derive(Debug)]
struct HeaderMap {
    date: usize,
    time: usize,
    category: usize,
    value: Option<usize>,
    /// `(source index, name)` of every passthrough column, in source order.
    passthrough: Vec<(usize, String)>,
    /// Output layout in source order (derived columns appended later).
    layout: Vec<Column>,
    duplicates: Vec<String>,
}

/// Canonical name for a raw header cell.
pub fn canonical_header(raw: &str) -> String {
    // Spreadsheet CSV exports often carry a BOM on the first header.
    let name = raw.trim().trim_start_matches('\u{feff}').trim();
    SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| name.to_string())
}

fn build_header_map(headers: &[String]) -> Result<HeaderMap, EtlError> {
    let mut seen = HashSet::new();
    let mut positions: [Option<usize>; 4] = [None; 4];
    let mut passthrough = Vec::new();
    let mut layout = Vec::new();
    let mut duplicates = Vec::new();

    for (idx, raw) in headers.iter().enumerate() {
        let name = canonical_header(raw);
        if !seen.insert(name.clone()) {
            duplicates.push(name);
            continue;
        }
        if name == COL_TIMESTAMP {
            // Derived column (a table written by a previous run): keeps its position,
            // values are always recomputed.
            layout.push(Column {
                name,
                field: Field::Timestamp,
            });
            continue;
        }

        let field = match name.as_str() {
            COL_DATE => {
                positions[0] = Some(idx);
                Field::Date
            }
            COL_TIME => {
                positions[1] = Some(idx);
                Field::Time
            }
            COL_CATEGORY => {
                positions[2] = Some(idx);
                Field::Category
            }
            COL_VALUE => {
                positions[3] = Some(idx);
                Field::Value
            }
            _ => {
                passthrough.push((idx, name.clone()));
                Field::Extra(passthrough.len() - 1)
            }
        };
        layout.push(Column { name, field });
    }

    for (pos, column) in positions.iter().zip(REQUIRED) {
        if pos.is_none() {
            return Err(EtlError::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    Ok(HeaderMap {
        date: positions[0].unwrap_or_default(),
        time: positions[1].unwrap_or_default(),
        category: positions[2].unwrap_or_default(),
        value: positions[3],
        passthrough,
        layout,
        duplicates,
    })
}

/// Normalize a raw table into an immutable `Dataset`.
///
/// Fails only on schema problems; cell defects are recovered and counted.
pub fn normalize(table: &RawTable) -> Result<Dataset, EtlError> {
    let header = build_header_map(&table.headers)?;
    let mut report = NormalizeReport {
        rows_read: table.rows.len(),
        value_column_synthesized: header.value.is_none(),
        duplicate_columns: header.duplicates.clone(),
        ..NormalizeReport::default()
    };

    if !header.duplicates.is_empty() {
        warn!(columns = ?header.duplicates, "duplicate columns after canonicalization; keeping the first");
    }

    let mut records = Vec::with_capacity(table.rows.len());
    let mut last_date = None;

    for (row_idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(|c| c.to_text().is_none()) {
            report.blank_rows_skipped += 1;
            continue;
        }

        // Forward-fill runs in file order, before any sorting.
        let date = match cells::parse_date_cell(table.cell(row_idx, header.date)) {
            Some(d) => {
                last_date = Some(d);
                d
            }
            None => {
                report.dates_unparsed += 1;
                match last_date {
                    Some(d) => {
                        report.dates_forward_filled += 1;
                        d
                    }
                    None => {
                        report.leading_undated_dropped += 1;
                        continue;
                    }
                }
            }
        };

        let time = cells::time_text(table.cell(row_idx, header.time));
        let time_of_day = cells::parse_time_of_day(&time);
        if time_of_day.is_none() {
            report.times_unparsed += 1;
        }

        // Kept as read: the critical label is an exact match.
        let category = table.cell(row_idx, header.category).to_text();

        let value = match header.value.map(|idx| table.cell(row_idx, idx)) {
            None => 0.0,
            Some(RawCell::Empty) => {
                report.values_defaulted += 1;
                0.0
            }
            Some(cell) => cells::parse_value(cell).unwrap_or_else(|| {
                if cell.to_text().is_some() {
                    report.values_unparsed += 1;
                } else {
                    report.values_defaulted += 1;
                }
                0.0
            }),
        };

        let extra = header
            .passthrough
            .iter()
            .map(|(idx, _)| table.cell(row_idx, *idx).to_text())
            .collect();

        records.push(IncidentRecord {
            source_row: row_idx + 1,
            date,
            timestamp: time_of_day.map(|t| date.and_time(t)),
            time,
            time_of_day,
            category,
            value,
            extra,
        });
    }

    // Stable: equal keys keep file order. Unparseable times sort last within their day.
    records.sort_by_key(|r| (r.date, r.time_of_day.is_none(), r.time_of_day));

    if report.leading_undated_dropped > 0 {
        warn!(
            rows = report.leading_undated_dropped,
            "rows before the first valid date cannot be forward-filled; dropped"
        );
    }
    debug!(
        rows = records.len(),
        dates_filled = report.dates_forward_filled,
        times_unparsed = report.times_unparsed,
        values_unparsed = report.values_unparsed,
        "normalized dataset"
    );

    let mut layout = header.layout;
    if !layout.iter().any(|c| c.field == Field::Timestamp) {
        layout.push(Column {
            name: COL_TIMESTAMP.to_string(),
            field: Field::Timestamp,
        });
    }
    if header.value.is_none() {
        layout.push(Column {
            name: COL_VALUE.to_string(),
            field: Field::Value,
        });
    }
    let passthrough = header.passthrough.into_iter().map(|(_, name)| name).collect();

    Ok(Dataset::new(records, layout, passthrough, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn table(headers: &[&str], rows: Vec<Vec<RawCell>>) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn headers_are_trimmed_and_synonyms_renamed() {
        assert_eq!(canonical_header("  Date "), "Date");
        assert_eq!(canonical_header("\u{feff}Date"), "Date");
        assert_eq!(canonical_header(" prix"), "Prix");
        assert_eq!(canonical_header("Type d'incident"), "Type d’incident");
        // No case folding beyond the known synonyms.
        assert_eq!(canonical_header("DATE"), "DATE");
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let t = table(&["Date", "Type d’incident"], vec![vec![text("01/01/2026"), text("Vol confirmé")]]);
        let err = normalize(&t).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { ref column } if column == "Heure"));
    }

    #[test]
    fn forward_fill_uses_file_order_before_sort() {
        let t = table(
            &[" Date", "Heure ", "Type d’incident", "prix"],
            vec![
                vec![text("03/01/2026"), text("10:00"), text("A"), RawCell::Number(1.0)],
                vec![text("???"), text("09:00"), text("B"), RawCell::Number(2.0)],
                vec![text("01/01/2026"), text("08:00"), text("C"), RawCell::Number(3.0)],
            ],
        );
        let ds = normalize(&t).unwrap();
        let rows = ds.all();
        assert_eq!(rows.len(), 3);
        // Row 2 inherits 2026-01-03 from row 1 (file order), not 2026-01-01.
        let filled = rows.iter().find(|r| r.source_row == 2).unwrap();
        assert_eq!(filled.date, d(2026, 1, 3));
        assert_eq!(ds.report().dates_forward_filled, 1);

        let order: Vec<usize> = rows.iter().map(|r| r.source_row).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn every_record_has_a_date_and_leading_gaps_are_dropped() {
        let t = table(
            &["Date", "Heure", "Type d’incident"],
            vec![
                vec![RawCell::Empty, text("10:00"), text("A")],
                vec![text("02/01/2026"), text("10:00"), text("B")],
                vec![RawCell::Empty, text("11:00"), text("C")],
            ],
        );
        let ds = normalize(&t).unwrap();
        assert_eq!(ds.all().len(), 2);
        assert!(ds.all().iter().all(|r| r.date == d(2026, 1, 2)));
        assert_eq!(ds.report().leading_undated_dropped, 1);
        assert_eq!(ds.report().dates_unparsed, 2);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let t = table(
            &["Date", "Heure", "Type d’incident"],
            vec![
                vec![text("01/01/2026"), text("10:00"), text("first")],
                vec![text("01/01/2026"), text("09:00"), text("early")],
                vec![text("01/01/2026"), text("10:00"), text("second")],
                vec![text("01/01/2026"), text("??"), text("untimed")],
            ],
        );
        let ds = normalize(&t).unwrap();
        let cats: Vec<&str> = ds.all().iter().map(|r| r.category.as_deref().unwrap()).collect();
        assert_eq!(cats, vec!["early", "first", "second", "untimed"]);
    }

    #[test]
    fn timestamp_is_none_when_time_fails() {
        let t = table(
            &["Date", "Heure", "Type d’incident"],
            vec![
                vec![text("01/01/2026"), text("14h30"), text("A")],
                vec![text("01/01/2026"), text("soir"), text("B")],
            ],
        );
        let ds = normalize(&t).unwrap();
        let a = &ds.all()[0];
        assert_eq!(a.timestamp, Some(d(2026, 1, 1).and_hms_opt(14, 30, 0).unwrap()));
        let b = &ds.all()[1];
        assert_eq!(b.time, "soir");
        assert_eq!(b.timestamp, None);
        assert_eq!(ds.report().times_unparsed, 1);
    }

    #[test]
    fn value_column_is_synthesized_when_absent() {
        let t = table(
            &["Date", "Heure", "Type d’incident", "Lieu"],
            vec![vec![text("01/01/2026"), text("10:00"), text("A"), text("Porte B")]],
        );
        let ds = normalize(&t).unwrap();
        assert_eq!(ds.all()[0].value, 0.0);
        assert!(ds.report().value_column_synthesized);
        assert_eq!(
            ds.columns(),
            vec!["Date", "Heure", "Type d’incident", "Lieu", "DateHeure", "Prix"]
        );
        assert_eq!(ds.all()[0].extra, vec![Some("Porte B".to_string())]);
    }

    #[test]
    fn null_and_bad_values_become_zero() {
        let t = table(
            &["Date", "Heure", "Type d’incident", "Prix"],
            vec![
                vec![text("01/01/2026"), text("10:00"), text("A"), RawCell::Empty],
                vec![text("01/01/2026"), text("11:00"), text("A"), text("gratuit")],
                vec![text("01/01/2026"), text("12:00"), text("A"), text("-5")],
            ],
        );
        let ds = normalize(&t).unwrap();
        let values: Vec<f64> = ds.all().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![0.0, 0.0, -5.0]);
        assert_eq!(ds.report().values_defaulted, 1);
        assert_eq!(ds.report().values_unparsed, 1);
    }

    #[test]
    fn stored_timestamp_column_is_recomputed_not_passed_through() {
        let t = table(
            &["Date", "Heure", "Type d’incident", "Prix", "DateHeure"],
            vec![vec![
                text("2026-01-01"),
                text("10:00"),
                text("A"),
                RawCell::Number(1.0),
                text("1999-01-01 00:00:00"),
            ]],
        );
        let ds = normalize(&t).unwrap();
        assert!(ds.passthrough_columns().is_empty());
        assert_eq!(ds.columns(), vec!["Date", "Heure", "Type d’incident", "Prix", "DateHeure"]);
        assert_eq!(
            ds.all()[0].timestamp,
            Some(d(2026, 1, 1).and_hms_opt(10, 0, 0).unwrap())
        );
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let t = table(
            &["Date", "Heure", "Type d’incident", "Prix", "Commentaire"],
            vec![
                vec![text("02/01/2026"), text("10:00"), text("A"), text("12,5"), text("x")],
                vec![RawCell::Empty, text("09:00"), text("B"), RawCell::Empty, RawCell::Empty],
                vec![text("01/01/2026"), text("?"), RawCell::Empty, RawCell::Number(3.0), text("y")],
            ],
        );
        let a = normalize(&t).unwrap();
        let b = normalize(&t).unwrap();
        assert_eq!(a.all(), b.all());
        assert_eq!(a.columns(), b.columns());
        assert_eq!(
            serde_json::to_string(a.all()).unwrap(),
            serde_json::to_string(b.all()).unwrap()
        );
    }

    #[test]
    fn blank_rows_are_skipped() {
        let t = table(
            &["Date", "Heure", "Type d’incident"],
            vec![
                vec![text("01/01/2026"), text("10:00"), text("A")],
                vec![RawCell::Empty, text("  "), RawCell::Empty],
            ],
        );
        let ds = normalize(&t).unwrap();
        assert_eq!(ds.all().len(), 1);
        assert_eq!(ds.report().blank_rows_skipped, 1);
        assert_eq!(ds.report().dates_unparsed, 0);
    }

    #[test]
    fn category_text_is_not_trimmed() {
        let t = table(
            &["Date", "Heure", "Type d’incident"],
            vec![
                vec![text("01/01/2026"), text("10:00"), text("Vol confirmé ")],
                vec![text("01/01/2026"), text("11:00"), text("Vol confirmé")],
                vec![text("01/01/2026"), text("12:00"), text("   ")],
            ],
        );
        let ds = normalize(&t).unwrap();
        assert_eq!(ds.all()[0].category.as_deref(), Some("Vol confirmé "));
        assert_eq!(ds.all()[2].category, None);

        let refs: Vec<_> = ds.all().iter().collect();
        assert_eq!(crate::aggregate::critical_count(&refs, "Vol confirmé"), 1);
    }
}
