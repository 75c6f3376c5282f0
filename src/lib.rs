//! `incident-dash` library crate.
//!
//! The binary (`idash`) is a thin wrapper around this library so that:
//!
//! - the ETL / filter / aggregate core is testable without spawning processes
//! - the CLI and the TUI share one pipeline
//! - presentation code never touches the store directly

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod filter;
pub mod io;
pub mod normalize;
pub mod plot;
pub mod report;
pub mod tui;
