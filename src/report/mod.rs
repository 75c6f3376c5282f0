//! Reporting: status banner and formatted terminal output.

use crate::aggregate::StatusSignal;

pub mod format;

pub use format::{
    UNCATEGORIZED, format_amount, format_kpis, format_load_summary, format_rows, format_summary,
};

/// One-line banner for a status signal, e.g. `⚠️ 2 vol(s) confirmé(s)`.
pub fn status_banner(status: StatusSignal, critical_label: &str) -> String {
    match status {
        StatusSignal::Nominal => "✅ Aucun incident critique".to_string(),
        StatusSignal::Alert { critical } => format!("⚠️ {critical} {}", plural_label(critical_label)),
    }
}

/// Lower-case every word of the label and mark it as a possible plural.
fn plural_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| format!("{}(s)", word.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}
