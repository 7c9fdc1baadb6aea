//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - resolves settings (env / `.env`, overridden by flags)
//! - runs the validate -> fit pipeline
//! - prints summaries, renders reports and talks to the record store

use clap::Parser;
use tracing::debug;

use crate::cli::{
    Cli, Command, EstimateArgs, FitArgs, GlobalArgs, ListArgs, PlotArgs, ReportArgs, SaveArgs, ShowArgs,
};
use crate::config::Settings;
use crate::error::AppError;
use crate::store::ResultStore;

pub mod pipeline;

/// Entry point for the `mcal` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::telemetry::init_logging(cli.global.log_level.as_deref())?;
    debug!(command = ?cli.command, "starting");

    match cli.command {
        Command::Fit(args) => handle_fit(&cli.global, args),
        Command::Report(args) => handle_report(&cli.global, args),
        Command::Save(args) => handle_save(&cli.global, args),
        Command::List(args) => handle_list(&cli.global, args),
        Command::Show(args) => handle_show(&cli.global, args),
        Command::Estimate(args) => handle_estimate(&cli.global, args),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Open the store from settings, with `--db` taking precedence.
fn open_store(global: &GlobalArgs) -> Result<ResultStore, AppError> {
    let mut settings = Settings::from_env()?;
    if let Some(path) = &global.db {
        settings.store.path = path.clone();
    }
    Ok(ResultStore::open(&settings.store)?)
}

fn handle_fit(global: &GlobalArgs, args: FitArgs) -> Result<(), AppError> {
    let run = pipeline::compute_fit(&args.input.input, &global.column_schema(), args.input.model)?;
    let samples = &run.validated.samples;
    let title = args
        .input
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    println!(
        "{}",
        crate::report::format_fit_summary(&title, &run.fit, samples, &run.validated.rejections)
    );
    println!("{}", crate::report::format_sample_table(&run.fit, samples));

    if args.plot {
        println!(
            "{}",
            crate::plot::render_ascii_plot(&run.fit, samples, args.width, args.height)
        );
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_results_csv(path, &run.fit, samples)?;
    }
    if let Some(path) = &args.export_curve {
        crate::io::write_curve_json(path, &title, &run.fit, samples)?;
    }

    Ok(())
}

fn handle_report(global: &GlobalArgs, args: ReportArgs) -> Result<(), AppError> {
    // Open the store first so a bad database fails before any file is written.
    let store = if args.save { Some(open_store(global)?) } else { None };

    let run = pipeline::compute_fit(&args.input.input, &global.column_schema(), args.input.model)?;
    let bytes = pipeline::render(&args.title, &run, &args.output)?;
    println!("Wrote {} ({bytes} bytes)", args.output.display());

    if let Some(store) = store {
        let id = pipeline::save(&store, &args.title, &run)?;
        println!("Saved calibration {id}");
    }
    Ok(())
}

fn handle_save(global: &GlobalArgs, args: SaveArgs) -> Result<(), AppError> {
    let store = open_store(global)?;
    let run = pipeline::compute_fit(&args.input.input, &global.column_schema(), args.input.model)?;
    let id = pipeline::save(&store, &args.title, &run)?;
    println!("{id}");
    Ok(())
}

fn handle_list(global: &GlobalArgs, args: ListArgs) -> Result<(), AppError> {
    let records = open_store(global)?.list()?;
    if args.json {
        println!("{}", to_json(&records)?);
    } else {
        print!("{}", crate::report::format_record_list(&records));
    }
    Ok(())
}

fn handle_show(global: &GlobalArgs, args: ShowArgs) -> Result<(), AppError> {
    let record = open_store(global)?.get(args.id)?;
    if args.json {
        println!("{}", to_json(&record)?);
    } else {
        print!("{}", crate::report::format_record(&record));
    }
    Ok(())
}

fn handle_estimate(global: &GlobalArgs, args: EstimateArgs) -> Result<(), AppError> {
    let record = open_store(global)?.get(args.id)?;
    let fit = &record.fit;

    match (args.maturity, args.strength) {
        (Some(maturity), _) => {
            if !(maturity.is_finite() && maturity > 0.0) {
                return Err(AppError::new(2, "--maturity must be a positive number"));
            }
            let strength = crate::models::predict(fit, maturity);
            println!("{strength:.2} MPa at {maturity:.1} °C·h ({})", fit.equation());
        }
        (None, Some(strength)) => {
            let maturity = crate::fit::required_maturity(fit, strength)?;
            println!("{maturity:.1} °C·h to reach {strength:.2} MPa ({})", fit.equation());
        }
        (None, None) => return Err(AppError::new(2, "pass --maturity or --strength")),
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = crate::io::read_curve_json(&args.curve)?;
    let plot = crate::plot::render_ascii_plot_from_curve_file(&curve, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(2, format!("Failed to encode JSON: {e}")))
}
