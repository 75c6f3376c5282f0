//! Aggregator: KPIs and grouped views over a filtered record sequence.
//!
//! Every output is derived independently from the same input and is well defined
//! on the empty sequence (zero counts, zero sum, empty distributions).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::IncidentRecord;

/// Banner state derived from the critical count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusSignal {
    Nominal,
    Alert { critical: usize },
}

impl StatusSignal {
    pub fn from_critical_count(critical: usize) -> Self {
        if critical == 0 {
            StatusSignal::Nominal
        } else {
            StatusSignal::Alert { critical }
        }
    }

    pub fn is_alert(self) -> bool {
        matches!(self, StatusSignal::Alert { .. })
    }
}

impl fmt::Display for StatusSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusSignal::Nominal => write!(f, "nominal"),
            StatusSignal::Alert { critical } => write!(f, "alert({critical})"),
        }
    }
}

/// Number of records with one category. `None` groups records without a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Option<String>,
    pub count: usize,
}

/// Number of records on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// One equal-width bucket of the value histogram. `hi` is inclusive for the last bin only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// All aggregate views for one filtered selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub total_count: usize,
    pub critical_count: usize,
    pub value_sum: f64,
    /// Order is not significant.
    pub category_distribution: Vec<CategoryCount>,
    /// Ascending by date; dates without records are absent.
    pub time_series: Vec<DailyCount>,
    pub status: StatusSignal,
}

/// Compute every aggregate view of `records`.
pub fn aggregate(records: &[&IncidentRecord], critical_label: &str) -> Aggregates {
    let critical = critical_count(records, critical_label);
    Aggregates {
        total_count: records.len(),
        critical_count: critical,
        value_sum: value_sum(records),
        category_distribution: category_distribution(records),
        time_series: time_series(records),
        status: StatusSignal::from_critical_count(critical),
    }
}

/// Records whose category equals `label` exactly.
pub fn critical_count(records: &[&IncidentRecord], label: &str) -> usize {
    records.iter().filter(|r| r.is_category(label)).count()
}

pub fn value_sum(records: &[&IncidentRecord]) -> f64 {
    records.iter().fold(0.0, |acc, r| acc + r.value)
}

/// Count per distinct category, most frequent first (ties by name, uncategorized last).
pub fn category_distribution(records: &[&IncidentRecord]) -> Vec<CategoryCount> {
    let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
    for r in records {
        *counts.entry(r.category.as_deref()).or_default() += 1;
    }

    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.map(str::to_string),
            count,
        })
        .collect();
    out.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.is_none().cmp(&b.category.is_none()))
            .then_with(|| a.category.cmp(&b.category))
    });
    out
}

/// Count per distinct date, ascending. No gap filling.
pub fn time_series(records: &[&IncidentRecord]) -> Vec<DailyCount> {
    let mut by_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for r in records {
        *by_date.entry(r.date).or_default() += 1;
    }
    by_date
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Equal-width histogram of `value` over `[min, max]`.
pub fn value_histogram(records: &[&IncidentRecord], bins: usize) -> Vec<HistogramBin> {
    let bins = bins.max(1);
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for r in records {
        min = min.min(r.value);
        max = max.max(r.value);
    }
    if !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }

    if max <= min {
        return vec![HistogramBin {
            lo: min,
            hi: max,
            count: records.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lo: min + width * i as f64,
            hi: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for r in records {
        let idx = (((r.value - min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_CRITICAL_LABEL;

    fn record(date: (i32, u32, u32), category: Option<&str>, value: f64) -> IncidentRecord {
        IncidentRecord {
            source_row: 0,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: String::new(),
            time_of_day: None,
            timestamp: None,
            category: category.map(str::to_string),
            value,
            extra: Vec::new(),
        }
    }

    #[test]
    fn empty_sequence_has_defaults() {
        let agg = aggregate(&[], DEFAULT_CRITICAL_LABEL);
        assert_eq!(agg.total_count, 0);
        assert_eq!(agg.critical_count, 0);
        assert_eq!(agg.value_sum, 0.0);
        assert!(agg.category_distribution.is_empty());
        assert!(agg.time_series.is_empty());
        assert_eq!(agg.status, StatusSignal::Nominal);
        assert!(value_histogram(&[], 25).is_empty());
    }

    #[test]
    fn distribution_sums_to_total_including_uncategorized() {
        let rows = [
            record((2026, 1, 1), Some("Vol confirmé"), 1.0),
            record((2026, 1, 1), None, 2.0),
            record((2026, 1, 2), Some("Bris de vitre"), 3.0),
            record((2026, 1, 2), Some("Vol confirmé"), 4.0),
        ];
        let refs: Vec<&IncidentRecord> = rows.iter().collect();
        let agg = aggregate(&refs, DEFAULT_CRITICAL_LABEL);

        let sum: usize = agg.category_distribution.iter().map(|c| c.count).sum();
        assert_eq!(sum, agg.total_count);
        assert_eq!(agg.category_distribution[0].category.as_deref(), Some("Vol confirmé"));
        assert_eq!(agg.category_distribution[0].count, 2);
        assert_eq!(agg.category_distribution.last().unwrap().category, None);
        assert_eq!(agg.value_sum, 10.0);
    }

    #[test]
    fn critical_label_is_exact_match() {
        let rows = [
            record((2026, 1, 1), Some("Vol confirmé"), 0.0),
            record((2026, 1, 1), Some("vol confirmé"), 0.0),
            record((2026, 1, 1), Some("Vol confirmé "), 0.0),
        ];
        let refs: Vec<&IncidentRecord> = rows.iter().collect();
        assert_eq!(critical_count(&refs, DEFAULT_CRITICAL_LABEL), 1);
    }

    #[test]
    fn status_is_alert_iff_critical() {
        assert_eq!(StatusSignal::from_critical_count(0), StatusSignal::Nominal);
        assert!(!StatusSignal::from_critical_count(0).is_alert());
        assert!(StatusSignal::from_critical_count(3).is_alert());
        assert_eq!(StatusSignal::from_critical_count(2).to_string(), "alert(2)");
        assert_eq!(StatusSignal::Nominal.to_string(), "nominal");
    }

    #[test]
    fn time_series_is_sorted_without_gaps_filled() {
        let rows = [
            record((2026, 1, 3), None, 0.0),
            record((2026, 1, 1), None, 0.0),
            record((2026, 1, 3), None, 0.0),
        ];
        let refs: Vec<&IncidentRecord> = rows.iter().collect();
        let series = time_series(&refs);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(series[0].count, 1);
        assert_eq!(series[1].count, 2);
    }

    #[test]
    fn histogram_puts_max_in_last_bin() {
        let rows = [
            record((2026, 1, 1), None, 0.0),
            record((2026, 1, 1), None, 50.0),
            record((2026, 1, 1), None, 100.0),
        ];
        let refs: Vec<&IncidentRecord> = rows.iter().collect();
        let bins = value_histogram(&refs, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![1, 0, 1, 1]);
        assert_eq!(bins[3].hi, 100.0);

        let flat = value_histogram(&refs[..1], 4);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 1);
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_string(&StatusSignal::Alert { critical: 2 }).unwrap();
        assert_eq!(json, r#"{"status":"alert","critical":2}"#);
    }
}
