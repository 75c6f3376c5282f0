//! The dataset store: one immutable, normalized load cycle.
//!
//! `Dataset` has no mutation API. A reload builds a new instance and publishes it
//! through `SharedDataset`, which swaps an `Arc` so readers observe either the old
//! dataset or the new one in full.

use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::NaiveDate;

use crate::domain::IncidentRecord;
use crate::normalize::NormalizeReport;

/// Which record field a column reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Time,
    Timestamp,
    Category,
    Value,
    /// Index into `IncidentRecord::extra`.
    Extra(usize),
}

/// A named output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub field: Field,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<IncidentRecord>,
    layout: Vec<Column>,
    passthrough: Vec<String>,
    report: NormalizeReport,
}

impl Dataset {
    /// Assemble a dataset. Records must already be normalized and sorted.
    pub(crate) fn new(
        records: Vec<IncidentRecord>,
        layout: Vec<Column>,
        passthrough: Vec<String>,
        report: NormalizeReport,
    ) -> Self {
        Self {
            records,
            layout,
            passthrough,
            report,
        }
    }

    /// All records in `(date, time)` order.
    pub fn all(&self) -> &[IncidentRecord] {
        &self.records
    }

    /// Field names present, in display order (passthrough fields included).
    pub fn columns(&self) -> Vec<&str> {
        self.layout.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn layout(&self) -> &[Column] {
        &self.layout
    }

    pub fn passthrough_columns(&self) -> &[String] {
        &self.passthrough
    }

    pub fn report(&self) -> &NormalizeReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last incident dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.records.first()?.date, self.records.last()?.date))
    }

    /// Distinct non-null categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|r| r.category.as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Display text of one cell of the row listing.
pub fn cell_text(record: &IncidentRecord, field: Field) -> String {
    match field {
        Field::Date => record.date.format("%Y-%m-%d").to_string(),
        Field::Time => record.time.clone(),
        Field::Timestamp => record
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Field::Category => record.category.clone().unwrap_or_default(),
        Field::Value => format!("{:.2}", record.value),
        Field::Extra(idx) => record.extra.get(idx).cloned().flatten().unwrap_or_default(),
    }
}

/// The currently published dataset, shared between readers.
///
/// Readers never block a reload; a snapshot stays valid after the swap.
#[derive(Debug)]
pub struct SharedDataset {
    current: ArcSwap<Dataset>,
}

impl SharedDataset {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            current: ArcSwap::from_pointee(dataset),
        }
    }

    /// A consistent view of the current dataset. Later reloads do not affect it.
    pub fn snapshot(&self) -> Arc<Dataset> {
        self.current.load_full()
    }

    /// Publish a new load cycle, returning the dataset it replaced.
    pub fn replace(&self, dataset: Dataset) -> Arc<Dataset> {
        self.current.swap(Arc::new(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawCell, RawTable};
    use crate::normalize::normalize;

    fn dataset(rows: &[(&str, &str, &str)]) -> Dataset {
        let table = RawTable {
            headers: vec!["Date".into(), "Heure".into(), "Type d’incident".into()],
            rows: rows
                .iter()
                .map(|(d, t, c)| {
                    vec![
                        RawCell::Text(d.to_string()),
                        RawCell::Text(t.to_string()),
                        RawCell::Text(c.to_string()),
                    ]
                })
                .collect(),
        };
        normalize(&table).unwrap()
    }

    #[test]
    fn bounds_and_categories() {
        let ds = dataset(&[
            ("05/01/2026", "10:00", "Vol confirmé"),
            ("02/01/2026", "10:00", "Bris de vitre"),
            ("03/01/2026", "10:00", "Vol confirmé"),
        ]);
        let (lo, hi) = ds.date_bounds().unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(ds.categories(), vec!["Bris de vitre", "Vol confirmé"]);
    }

    #[test]
    fn snapshots_survive_replacement() {
        let shared = SharedDataset::new(dataset(&[("01/01/2026", "10:00", "A")]));
        let before = shared.snapshot();

        let old = shared.replace(dataset(&[
            ("01/01/2026", "10:00", "A"),
            ("02/01/2026", "10:00", "B"),
        ]));

        assert_eq!(before.len(), 1);
        assert_eq!(old.len(), 1);
        assert_eq!(shared.snapshot().len(), 2);
    }

    #[test]
    fn cell_text_per_field() {
        let ds = dataset(&[("01/01/2026", "14:30", "A")]);
        let r = &ds.all()[0];
        assert_eq!(cell_text(r, Field::Date), "2026-01-01");
        assert_eq!(cell_text(r, Field::Timestamp), "2026-01-01 14:30:00");
        assert_eq!(cell_text(r, Field::Value), "0.00");
        assert_eq!(cell_text(r, Field::Extra(3)), "");
    }
}
