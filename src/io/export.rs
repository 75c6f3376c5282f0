//! Exports of one filtered view.
//!
//! - the filtered row listing as CSV (easy to reopen in a spreadsheet)
//! - the aggregate views as JSON (for scripting)

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::Aggregates;
use crate::dataset::{Dataset, cell_text};
use crate::domain::IncidentRecord;
use crate::error::AppError;
use crate::filter::FilterSpec;

/// Header of the 1-based position column in row listings.
pub const INDEX_COLUMN: &str = "IndexIncident";

/// Write the filtered rows, one column per dataset column plus a leading index.
pub fn write_rows_csv(path: &Path, dataset: &Dataset, rows: &[&IncidentRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_rows(file, dataset, rows)
}

fn write_rows<W: std::io::Write>(out: W, dataset: &Dataset, rows: &[&IncidentRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec![INDEX_COLUMN];
    header.extend(dataset.columns());
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (idx, record) in rows.iter().enumerate() {
        let mut line = vec![(idx + 1).to_string()];
        line.extend(dataset.layout().iter().map(|c| cell_text(record, c.field)));
        writer
            .write_record(&line)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// JSON document written by `--json-out`.
#[derive(Debug, Serialize)]
pub struct SummaryFile<'a> {
    pub tool: &'static str,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub categories: Vec<&'a str>,
    pub critical_label: &'a str,
    pub aggregates: &'a Aggregates,
}

impl<'a> SummaryFile<'a> {
    pub fn new(spec: &'a FilterSpec, critical_label: &'a str, aggregates: &'a Aggregates) -> Self {
        Self {
            tool: "idash",
            start: spec.start,
            end: spec.end,
            categories: spec
                .categories
                .iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            critical_label,
            aggregates,
        }
    }
}

/// Write the aggregates of one filtered view as pretty JSON.
pub fn write_summary_json(path: &Path, summary: &SummaryFile<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::domain::{RawCell, RawTable};
    use crate::filter;
    use crate::normalize::normalize;

    fn dataset() -> Dataset {
        let text = |s: &str| RawCell::Text(s.to_string());
        normalize(&RawTable {
            headers: vec!["Date".into(), "Heure".into(), "Type d’incident".into(), "Note".into()],
            rows: vec![
                vec![text("01/01/2026"), text("10:00"), text("Vol confirmé"), text("a, b")],
                vec![text("02/01/2026"), text("11:00"), text("Bris de vitre"), RawCell::Empty],
            ],
        })
        .unwrap()
    }

    #[test]
    fn rows_csv_has_index_and_all_columns() {
        let ds = dataset();
        let rows: Vec<&IncidentRecord> = ds.all().iter().collect();
        let mut buf = Vec::new();
        write_rows(&mut buf, &ds, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "IndexIncident,Date,Heure,Type d’incident,Note,DateHeure,Prix");
        assert_eq!(lines[1], "1,2026-01-01,10:00,Vol confirmé,\"a, b\",2026-01-01 10:00:00,0.00");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn summary_json_lists_filter_and_status() {
        let ds = dataset();
        let spec = FilterSpec::full_range(&ds).unwrap().with_categories(["Vol confirmé"]);
        let rows = filter::apply(&ds, &spec);
        let agg = aggregate(&rows, "Vol confirmé");
        let summary = SummaryFile::new(&spec, "Vol confirmé", &agg);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["categories"][0], "Vol confirmé");
        assert_eq!(json["aggregates"]["total_count"], 1);
        assert_eq!(json["aggregates"]["status"]["status"], "alert");
    }
}
