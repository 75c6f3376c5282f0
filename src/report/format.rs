//! Formatted terminal output.
//!
//! All text layout lives here so output changes stay localized (and golden-testable).

use std::path::Path;

use chrono::NaiveDate;

use crate::aggregate::{Aggregates, CategoryCount, DailyCount};
use crate::dataset::{Dataset, cell_text};
use crate::domain::IncidentRecord;
use crate::filter::FilterSpec;
use crate::io::INDEX_COLUMN;

use super::status_banner;

/// Widest cell printed in the row table.
const MAX_CELL: usize = 24;

/// Label used for records without a category.
pub const UNCATEGORIZED: &str = "(sans type)";

/// Format a monetary total: two decimals, `,` thousands separator, `$` suffix.
pub fn format_amount(v: f64) -> String {
    let s = format!("{:.2}", v.abs());
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && s != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac} $")
}

/// `start .. end`, or "toutes dates" for an unbounded filter.
pub fn format_period(spec: &FilterSpec) -> String {
    if spec.start == NaiveDate::MIN && spec.end == NaiveDate::MAX {
        return "toutes dates".to_string();
    }
    format!("{} .. {}", spec.start, spec.end)
}

/// Selected categories, or "tous".
pub fn format_categories(spec: &FilterSpec) -> String {
    match &spec.categories {
        Some(set) if !set.is_empty() => set.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
        _ => "tous".to_string(),
    }
}

/// The three KPI lines.
pub fn format_kpis(agg: &Aggregates, critical_label: &str) -> String {
    format!(
        "Total incidents : {}\nCritiques ({critical_label}) : {}\nValeur totale : {}\n",
        agg.total_count,
        agg.critical_count,
        format_amount(agg.value_sum)
    )
}

/// Category distribution with proportions.
pub fn format_distribution(dist: &[CategoryCount], total: usize) -> String {
    if dist.is_empty() {
        return "  (aucun incident)\n".to_string();
    }
    let mut out = String::new();
    for c in dist {
        let name = c.category.as_deref().unwrap_or(UNCATEGORIZED);
        let share = if total == 0 { 0.0 } else { 100.0 * c.count as f64 / total as f64 };
        out.push_str(&format!("  {:<24} {:>6} {:>5.1}%\n", truncate(name, 24), c.count, share));
    }
    out
}

/// One line per date with its incident count.
pub fn format_time_series(series: &[DailyCount]) -> String {
    if series.is_empty() {
        return "  (aucun incident)\n".to_string();
    }
    series
        .iter()
        .map(|d| format!("  {} {:>6}\n", d.date, d.count))
        .collect()
}

/// Full `idash summary` text report.
pub fn format_summary(spec: &FilterSpec, agg: &Aggregates, critical_label: &str) -> String {
    let mut out = String::new();

    out.push_str("=== idash - Tableau de bord sécurité ===\n");
    out.push_str(&format!("Période : {}\n", format_period(spec)));
    out.push_str(&format!("Types   : {}\n", format_categories(spec)));
    out.push_str(&status_banner(agg.status, critical_label));
    out.push_str("\n\n");

    out.push_str(&format_kpis(agg, critical_label));

    out.push_str("\nRépartition :\n");
    out.push_str(&format_distribution(&agg.category_distribution, agg.total_count));

    out.push_str("\nPar date :\n");
    out.push_str(&format_time_series(&agg.time_series));

    out
}

/// Summary printed after an ETL run.
pub fn format_load_summary(source: &Path, db: &Path, dataset: &Dataset, written: usize) -> String {
    let report = dataset.report();
    let mut out = String::new();

    out.push_str("=== idash - ETL ===\n");
    out.push_str(&format!("Source : {}\n", source.display()));
    out.push_str(&format!("Store  : {} (table {})\n", db.display(), crate::io::TABLE));
    out.push_str(&format!("Lignes : lues={} écrites={}\n", report.rows_read, written));
    out.push_str(&format!("Colonnes : {}\n", dataset.columns().join(", ")));
    if let Some((lo, hi)) = dataset.date_bounds() {
        out.push_str(&format!("Dates : {lo} .. {hi}\n"));
    }

    let counters = [
        ("lignes vides ignorées", report.blank_rows_skipped),
        ("dates absentes ou illisibles", report.dates_unparsed),
        ("dates reportées", report.dates_forward_filled),
        ("lignes sans date initiale, non enregistrées", report.leading_undated_dropped),
        ("heures illisibles", report.times_unparsed),
        ("prix vides (0)", report.values_defaulted),
        ("prix illisibles (0)", report.values_unparsed),
    ];
    let mut notes: Vec<String> = counters
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("  - {label} : {n}"))
        .collect();
    if report.value_column_synthesized {
        notes.push("  - colonne Prix absente, valeurs à 0".to_string());
    }
    for name in &report.duplicate_columns {
        notes.push(format!("  - colonne en double ignorée : {name}"));
    }

    if notes.is_empty() {
        out.push_str("Anomalies : aucune\n");
    } else {
        out.push_str("Anomalies :\n");
        for line in notes {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Filtered row listing: a 1-based index column, then every dataset column.
pub fn format_rows(dataset: &Dataset, rows: &[&IncidentRecord], limit: Option<usize>) -> String {
    let shown = limit.unwrap_or(rows.len()).min(rows.len());

    let mut headers = vec![INDEX_COLUMN.to_string()];
    headers.extend(dataset.columns().into_iter().map(str::to_string));

    let table: Vec<Vec<String>> = rows[..shown]
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let mut line = vec![(idx + 1).to_string()];
            line.extend(dataset.layout().iter().map(|c| cell_text(record, c.field)));
            line
        })
        .collect();

    let widths: Vec<usize> = (0..headers.len())
        .map(|col| {
            let widest = table
                .iter()
                .map(|line| line[col].chars().count())
                .chain(std::iter::once(headers[col].chars().count()))
                .max()
                .unwrap_or(0);
            widest.min(MAX_CELL)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for line in &table {
        push_row(&mut out, line, &widths);
    }

    if shown < rows.len() {
        out.push_str(&format!("... {} ligne(s) de plus\n", rows.len() - shown));
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:<w$}", truncate(cell, w)))
        .collect();
    out.push_str(line.join(" ").trim_end());
    out.push('\n');
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
