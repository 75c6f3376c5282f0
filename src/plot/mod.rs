//! Terminal plots for `idash summary --plot`.

pub mod ascii;

pub use ascii::{render_daily_plot, render_histogram};
