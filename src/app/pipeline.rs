//! Shared calibration workflow used by every subcommand.
//!
//! CSV -> validator -> fitter, then optionally renderer and/or store. The
//! front-end only decides what to print.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::{FitResult, ModelKind, RecordId, effective_title};
use crate::error::AppError;
use crate::io::{ColumnSchema, Validated, read_raw_samples_csv, validate_samples};
use crate::report::render_report_now;
use crate::store::ResultStore;

/// Outputs of one validate + fit pass.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub validated: Validated,
    pub fit: FitResult,
}

/// Load `input`, validate it against `schema` and fit `model`.
pub fn compute_fit(input: &Path, schema: &ColumnSchema, model: ModelKind) -> Result<FitRun, AppError> {
    let file = fs::File::open(input)
        .map_err(|e| AppError::new(2, format!("Failed to open input '{}': {e}", input.display())))?;
    let validated = validate_samples(&read_raw_samples_csv(file, schema)?)?;
    for r in &validated.rejections {
        warn!(row = r.index + 1, reason = r.reason.describe(), "skipped input row");
    }

    let fit = crate::fit::fit_samples(&validated.samples, model)?;
    info!(
        samples = validated.samples.len(),
        rejected = validated.rejections.len(),
        model = model.as_str(),
        r_squared = fit.r_squared,
        "fitted calibration"
    );
    Ok(FitRun { validated, fit })
}

/// Render the PDF for `run` and write it to `output`. Returns the byte count.
pub fn render(title: &str, run: &FitRun, output: &Path) -> Result<usize, AppError> {
    let bytes = render_report_now(title, &run.fit, &run.validated.samples)?;
    fs::write(output, &bytes)
        .map_err(|e| AppError::new(2, format!("Failed to write report '{}': {e}", output.display())))?;
    info!(path = %output.display(), bytes = bytes.len(), "wrote report");
    Ok(bytes.len())
}

/// Persist `run` as a new calibration record, under the same title the report shows.
pub fn save(store: &ResultStore, title: &str, run: &FitRun) -> Result<RecordId, AppError> {
    Ok(store.save(effective_title(title), &run.fit, &run.validated.samples)?)
}
