//! Command-line parsing for the incident dashboard.
//!
//! Argument parsing and command dispatch stay separate from the ETL / filter /
//! aggregate code. Unset flags fall back to the environment (see `config`).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::normalize::parse_day_first_date;

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "idash", version, about = "Security incident ETL and dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read the source spreadsheet, normalize it, and replace the store table.
    Etl(EtlArgs),
    /// Print KPIs, status banner, and grouped views of a filtered selection.
    Summary(SummaryArgs),
    /// Print (or export) the filtered rows.
    Rows(RowsArgs),
    /// Launch the interactive dashboard.
    Tui(ViewArgs),
}

#[derive(Debug, Args, Clone)]
pub struct EtlArgs {
    /// Source spreadsheet (.xlsx/.xls/.ods) or CSV export.
    #[arg(short = 's', long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Worksheet to read (ignored for CSV).
    #[arg(long)]
    pub sheet: Option<String>,

    /// SQLite store to (re)write.
    #[arg(long, value_name = "DB")]
    pub db: Option<PathBuf>,

    /// Always choose the source interactively.
    #[arg(long)]
    pub pick: bool,
}

/// Store location and filter, shared by every read-side command.
#[derive(Debug, Args, Clone, Default)]
pub struct ViewArgs {
    /// SQLite store to read.
    #[arg(long, value_name = "DB")]
    pub db: Option<PathBuf>,

    /// First date included (dd/mm/yyyy or yyyy-mm-dd). Defaults to the earliest date.
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last date included. Defaults to the latest date.
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Keep only these incident types (repeatable). Omitted means all.
    #[arg(short = 'c', long = "category", value_name = "TYPE")]
    pub categories: Vec<String>,

    /// Category counted as critical.
    #[arg(long)]
    pub critical_label: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Render ASCII plots (per-date counts and value histogram).
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 15)]
    pub height: usize,

    /// Number of value histogram bins.
    #[arg(long, default_value_t = 25)]
    pub bins: usize,

    /// Print the aggregates as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,

    /// Also write the aggregates as JSON to this file.
    #[arg(long = "json-out", value_name = "JSON")]
    pub json_out: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RowsArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Print at most this many rows.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Export the filtered rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_day_first_date(s).ok_or_else(|| format!("invalid date `{s}` (expected dd/mm/yyyy or yyyy-mm-dd)"))
}
