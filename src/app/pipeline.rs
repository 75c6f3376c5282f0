//! Shared pipeline logic used by both CLI and TUI front-ends.
//!
//! Write side: source -> normalize -> replace store table.
//! Read side: store -> normalize -> filter -> aggregate.
//!
//! The CLI and the TUI only deal with presentation (printing vs widgets).

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::aggregate::{Aggregates, aggregate};
use crate::config::Settings;
use crate::dataset::Dataset;
use crate::domain::IncidentRecord;
use crate::error::AppError;
use crate::filter::{self, FilterSpec};
use crate::io::{load_dataset, read_source, save_dataset};
use crate::normalize::normalize;

/// Outputs of one ETL run.
#[derive(Debug, Clone)]
pub struct EtlOutput {
    pub dataset: Dataset,
    pub written: usize,
}

/// Outputs of one filter + aggregate interaction.
#[derive(Debug, Clone)]
pub struct ViewOutput<'a> {
    pub rows: Vec<&'a IncidentRecord>,
    pub aggregates: Aggregates,
}

/// Read the configured source, normalize it, and replace the store table.
pub fn run_etl(settings: &Settings) -> Result<EtlOutput, AppError> {
    let table = read_source(&settings.source, &settings.sheet)?;
    let dataset = normalize(&table)?;

    let report = dataset.report();
    if report.cell_defects() > 0 {
        warn!(defects = report.cell_defects(), "source has unparseable cells");
    }

    let written = save_dataset(&settings.db, &dataset)?;
    info!(rows = written, "etl complete");
    Ok(EtlOutput { dataset, written })
}

/// Load the dataset from the configured store.
pub fn load(settings: &Settings) -> Result<Dataset, AppError> {
    Ok(load_dataset(&settings.db)?)
}

/// Build the filter of one interaction.
///
/// Unset bounds default to the dataset's date range; on an empty dataset they are
/// unbounded.
pub fn resolve_filter(
    dataset: &Dataset,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    categories: &[String],
) -> FilterSpec {
    let (lo, hi) = dataset.date_bounds().unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
    let spec = FilterSpec::new(from.unwrap_or(lo), to.unwrap_or(hi));
    if categories.is_empty() {
        spec
    } else {
        spec.with_categories(categories.iter().cloned())
    }
}

/// Filter `dataset` and aggregate the selection.
pub fn run_view<'a>(dataset: &'a Dataset, spec: &FilterSpec, critical_label: &str) -> ViewOutput<'a> {
    let rows = filter::apply(dataset, spec);
    let aggregates = aggregate(&rows, critical_label);
    ViewOutput { rows, aggregates }
}
