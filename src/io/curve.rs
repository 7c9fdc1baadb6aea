//! Read/write curve JSON files.
//!
//! Curve JSON is the "portable" representation of a fitted calibration:
//! - model kind + coefficients + R²
//! - the equation as printed in the report
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{CurveFile, CurveGrid, FitResult, SampleSet};
use crate::error::AppError;
use crate::report::{CURVE_RESOLUTION, fitted_curve};

/// Build the curve file contents for a fit.
pub fn build_curve_file(title: &str, fit: &FitResult, samples: &SampleSet) -> CurveFile {
    let (maturity, strength) = fitted_curve(fit, samples, CURVE_RESOLUTION).into_iter().unzip();
    CurveFile {
        tool: "mcal".to_string(),
        title: title.to_string(),
        equation: fit.equation(),
        fit: *fit,
        grid: CurveGrid { maturity, strength },
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, title: &str, fit: &FitResult, samples: &SampleSet) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &build_curve_file(title, fit, samples))
        .map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid curve JSON: {e}")))?;
    Ok(curve)
}
