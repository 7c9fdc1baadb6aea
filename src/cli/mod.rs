//! Command-line parsing for `mcal`.
//!
//! Argument parsing stays here; dispatch lives in [`crate::app`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_TITLE, ModelKind, RecordId};
use crate::io::ColumnSchema;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "mcal",
    version,
    about = "Concrete maturity/strength calibration (ASTM C1074)"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// SQLite database file (overrides MCAL_DB_PATH).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log filter, e.g. `info` or `maturity_calibration=debug` (overrides RUST_LOG).
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Name of the maturity column in input CSV files.
    #[arg(long, global = true, default_value = "maturity")]
    pub maturity_column: String,

    /// Name of the strength column in input CSV files.
    #[arg(long, global = true, default_value = "strength")]
    pub strength_column: String,
}

impl GlobalArgs {
    pub fn column_schema(&self) -> ColumnSchema {
        ColumnSchema {
            maturity: self.maturity_column.clone(),
            strength: self.strength_column.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a calibration curve and print the summary and sample table.
    Fit(FitArgs),
    /// Render the PDF calibration report.
    Report(ReportArgs),
    /// Fit and persist a calibration record.
    Save(SaveArgs),
    /// List saved calibrations.
    List(ListArgs),
    /// Show one saved calibration with its samples.
    Show(ShowArgs),
    /// Predict strength at a maturity, or the maturity needed for a strength.
    Estimate(EstimateArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
}

/// Input file and model, shared by the commands that fit.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// CSV file with maturity/strength columns.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Regression model.
    #[arg(long, value_enum, default_value_t = ModelKind::LogLinear)]
    pub model: ModelKind,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export per-sample results (fitted, residual) to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fitted curve (coefficients + grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output PDF path.
    #[arg(short = 'o', long, value_name = "PDF")]
    pub output: PathBuf,

    /// Report title (also the record title with --save). Blank falls back to the default.
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Also persist the calibration record.
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SaveArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Record title.
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    pub id: RecordId,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["maturity", "strength"])))]
pub struct EstimateArgs {
    pub id: RecordId,

    /// Predict strength (MPa) at this maturity (°C·h).
    #[arg(long)]
    pub maturity: Option<f64>,

    /// Find the maturity (°C·h) at which this strength (MPa) is reached.
    #[arg(long)]
    pub strength: Option<f64>,
}

/// Options for plotting a saved curve.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Curve JSON file produced by `mcal fit --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mcal",
            "fit",
            "-i",
            "lab.csv",
            "--model",
            "linear",
            "--maturity-column",
            "TTF",
            "--db",
            "x.db",
        ])
        .unwrap();
        assert_eq!(cli.global.db, Some(PathBuf::from("x.db")));
        assert_eq!(cli.global.column_schema().maturity, "TTF");
        assert_eq!(cli.global.column_schema().strength, "strength");
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.input.model, ModelKind::Linear);
    }

    #[test]
    fn estimate_needs_exactly_one_target() {
        assert!(Cli::try_parse_from(["mcal", "estimate", "1"]).is_err());
        assert!(Cli::try_parse_from(["mcal", "estimate", "1", "--maturity", "5", "--strength", "9"]).is_err());
        assert!(Cli::try_parse_from(["mcal", "estimate", "1", "--strength", "9.5"]).is_ok());
    }
}
