//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves settings
//! - runs the ETL or loads the store
//! - filters + aggregates
//! - prints reports/plots or starts the TUI
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, EtlArgs, RowsArgs, SummaryArgs, ViewArgs};
use crate::config::Settings;
use crate::error::AppError;
use crate::io::{SummaryFile, write_rows_csv, write_summary_json};

pub mod pipeline;

/// Entry point for the `idash` binary.
pub fn run() -> Result<(), AppError> {
    // `idash` and `idash --from ...` behave like `idash tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_tracing(matches!(cli.command, Command::Tui(_)));
    let settings = Settings::from_env();

    match cli.command {
        Command::Etl(args) => handle_etl(args, settings),
        Command::Summary(args) => handle_summary(args, settings),
        Command::Rows(args) => handle_rows(args, settings),
        Command::Tui(args) => handle_tui(args, settings),
    }
}

/// Logs go to stderr. `RUST_LOG` overrides the default level; the TUI defaults to
/// warnings only so the alternate screen stays clean.
fn init_tracing(quiet: bool) {
    let default = if quiet { "incident_dash=warn" } else { "incident_dash=info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_etl(args: EtlArgs, settings: Settings) -> Result<(), AppError> {
    let explicit_source = args.source.is_some();
    let mut settings = settings.with_overrides(args.source, args.sheet, args.db, None);

    if args.pick || (!explicit_source && !settings.source.is_file()) {
        settings.source = crate::cli::picker::prompt_for_source_path()?;
    }

    let out = pipeline::run_etl(&settings)?;
    println!(
        "{}",
        crate::report::format_load_summary(&settings.source, &settings.db, &out.dataset, out.written)
    );
    Ok(())
}

fn handle_summary(args: SummaryArgs, settings: Settings) -> Result<(), AppError> {
    let settings = view_settings(&args.view, settings);
    let dataset = pipeline::load(&settings)?;
    let spec = pipeline::resolve_filter(&dataset, args.view.from, args.view.to, &args.view.categories);
    let view = pipeline::run_view(&dataset, &spec, &settings.critical_label);
    let summary = SummaryFile::new(&spec, &settings.critical_label, &view.aggregates);

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| AppError::new(4, format!("Failed to serialize summary: {e}")))?;
        println!("{json}");
    } else {
        print!(
            "{}",
            crate::report::format_summary(&spec, &view.aggregates, &settings.critical_label)
        );
    }

    if args.plot && !args.json {
        println!();
        println!("Incidents par date");
        print!(
            "{}",
            crate::plot::render_daily_plot(&view.aggregates.time_series, args.width, args.height)
        );
        println!();
        println!("Distribution des prix");
        let bins = crate::aggregate::value_histogram(&view.rows, args.bins);
        print!("{}", crate::plot::render_histogram(&bins, args.width, args.height));
    }

    if let Some(path) = &args.json_out {
        write_summary_json(path, &summary)?;
    }
    Ok(())
}

fn handle_rows(args: RowsArgs, settings: Settings) -> Result<(), AppError> {
    let settings = view_settings(&args.view, settings);
    let dataset = pipeline::load(&settings)?;
    let spec = pipeline::resolve_filter(&dataset, args.view.from, args.view.to, &args.view.categories);
    let view = pipeline::run_view(&dataset, &spec, &settings.critical_label);

    print!("{}", crate::report::format_rows(&dataset, &view.rows, args.limit));

    if let Some(path) = &args.export {
        write_rows_csv(path, &dataset, &view.rows)?;
    }
    Ok(())
}

fn handle_tui(args: ViewArgs, settings: Settings) -> Result<(), AppError> {
    let settings = view_settings(&args, settings);
    crate::tui::run(settings, &args)
}

fn view_settings(args: &ViewArgs, settings: Settings) -> Settings {
    settings.with_overrides(None, None, args.db.clone(), args.critical_label.clone())
}

/// Rewrite argv so `idash` defaults to `idash tui`.
///
/// Rules:
/// - `idash`                        -> `idash tui`
/// - `idash --from 01/01/2026 ...`  -> `idash tui --from 01/01/2026 ...`
/// - `idash --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "etl" | "summary" | "rows" | "tui");
    if is_subcommand {
        return argv;
    }

    // A leading flag is a TUI flag.
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(argv(&["idash"])), argv(&["idash", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["idash", "--db", "x.db"])),
            argv(&["idash", "tui", "--db", "x.db"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        assert_eq!(rewrite_args(argv(&["idash", "etl"])), argv(&["idash", "etl"]));
        assert_eq!(rewrite_args(argv(&["idash", "--help"])), argv(&["idash", "--help"]));
    }

    #[test]
    fn view_flags_override_settings() {
        let args = ViewArgs {
            db: Some("other.db".into()),
            critical_label: Some("Intrusion".to_string()),
            ..ViewArgs::default()
        };
        let s = view_settings(&args, Settings::default());
        assert_eq!(s.db, std::path::PathBuf::from("other.db"));
        assert_eq!(s.critical_label, "Intrusion");
    }
}
