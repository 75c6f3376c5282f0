//! Filter engine: date range + optional category set.
//!
//! Pure function of its inputs. The output borrows from the dataset and keeps its
//! `(date, time)` order.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::dataset::Dataset;
use crate::domain::IncidentRecord;

/// The active filter of one interaction.
///
/// Bounds are inclusive and not validated: `start > end` selects nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// `None` or an empty set means "all categories".
    pub categories: Option<BTreeSet<String>>,
}

impl FilterSpec {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            categories: None,
        }
    }

    /// Whole-dataset range, no category filter. `None` for an empty dataset.
    pub fn full_range(dataset: &Dataset) -> Option<Self> {
        let (start, end) = dataset.date_bounds()?;
        Some(Self::new(start, end))
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, record: &IncidentRecord) -> bool {
        if record.date < self.start || record.date > self.end {
            return false;
        }
        match &self.categories {
            Some(set) if !set.is_empty() => record
                .category
                .as_ref()
                .is_some_and(|c| set.contains(c)),
            _ => true,
        }
    }
}

/// Select the records matching `spec`, in dataset order.
pub fn apply<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> Vec<&'a IncidentRecord> {
    dataset.all().iter().filter(|r| spec.matches(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawCell, RawTable};
    use crate::normalize::normalize;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> Dataset {
        let rows = [
            ("01/01/2026", "Vol confirmé"),
            ("02/01/2026", "Bris de vitre"),
            ("02/01/2026", ""),
            ("03/01/2026", "Vol confirmé"),
            ("05/01/2026", "Tentative"),
        ];
        let table = RawTable {
            headers: vec!["Date".into(), "Heure".into(), "Type d’incident".into()],
            rows: rows
                .iter()
                .map(|(date, cat)| {
                    vec![
                        RawCell::Text(date.to_string()),
                        RawCell::Text("10:00".to_string()),
                        RawCell::Text(cat.to_string()),
                    ]
                })
                .collect(),
        };
        normalize(&table).unwrap()
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let ds = sample();
        let out = apply(&ds, &FilterSpec::new(d(2026, 1, 2), d(2026, 1, 3)));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.date >= d(2026, 1, 2) && r.date <= d(2026, 1, 3)));
    }

    #[test]
    fn empty_category_set_means_no_filter() {
        let ds = sample();
        let none = apply(&ds, &FilterSpec::new(d(2026, 1, 1), d(2026, 1, 5)));
        let empty = apply(
            &ds,
            &FilterSpec::new(d(2026, 1, 1), d(2026, 1, 5)).with_categories(Vec::<String>::new()),
        );
        assert_eq!(none, empty);
        assert_eq!(none.len(), 5);
    }

    #[test]
    fn category_membership_excludes_uncategorized() {
        let ds = sample();
        let spec = FilterSpec::full_range(&ds)
            .unwrap()
            .with_categories(["Vol confirmé", "Tentative"]);
        let out = apply(&ds, &spec);
        let cats: Vec<&str> = out.iter().filter_map(|r| r.category.as_deref()).collect();
        assert_eq!(cats, vec!["Vol confirmé", "Vol confirmé", "Tentative"]);
    }

    #[test]
    fn inverted_range_is_empty_not_an_error() {
        let ds = sample();
        let out = apply(&ds, &FilterSpec::new(d(2026, 1, 5), d(2026, 1, 1)));
        assert!(out.is_empty());
    }

    #[test]
    fn output_keeps_dataset_order() {
        let ds = sample();
        let spec = FilterSpec::full_range(&ds).unwrap();
        let out = apply(&ds, &spec);
        let rows: Vec<usize> = out.iter().map(|r| r.source_row).collect();
        let all: Vec<usize> = ds.all().iter().map(|r| r.source_row).collect();
        assert_eq!(rows, all);
    }
}
