//! Export per-sample results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FitResult, SampleSet};
use crate::error::AppError;
use crate::fit::residuals;

/// Write per-sample results to any writer.
pub fn write_results_csv_to<W: Write>(
    mut out: W,
    fit: &FitResult,
    samples: &SampleSet,
) -> std::io::Result<()> {
    writeln!(out, "index,maturity,strength,fitted,residual")?;
    for (i, r) in residuals(fit, samples).iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{:.6},{:.6}",
            i + 1,
            r.sample.maturity,
            r.sample.strength,
            r.fitted,
            r.residual,
        )?;
    }
    Ok(())
}

/// Write per-sample results to a CSV file.
pub fn write_results_csv(path: &Path, fit: &FitResult, samples: &SampleSet) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results_csv_to(file, fit, samples)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}
