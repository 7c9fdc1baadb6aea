//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the validator, fitter, renderer and store as plain data
//! - exported to JSON/CSV
//! - reloaded from the record store and compared with the original inputs

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, MIN_SAMPLES};

/// Display label for the maturity axis/column.
pub const MATURITY_LABEL: &str = "Maturity (°C·h)";
/// Display label for the strength axis/column.
pub const STRENGTH_LABEL: &str = "Strength (MPa)";
/// Fixed-width timestamp format shared by the store, terminal output and the PDF footer.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Title used when the caller supplies a blank one.
pub const DEFAULT_TITLE: &str = "Maturity calibration";

/// Trimmed `title`, or [`DEFAULT_TITLE`] when it is blank.
pub fn effective_title(title: &str) -> &str {
    match title.trim() {
        "" => DEFAULT_TITLE,
        t => t,
    }
}

/// One paired measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Temperature-time integral (°C·h). Always finite and `> 0` inside a [`SampleSet`].
    pub maturity: f64,
    /// Compressive strength (MPa).
    pub strength: f64,
}

impl Sample {
    pub fn new(maturity: f64, strength: f64) -> Self {
        Self { maturity, strength }
    }

    /// Whether this sample may take part in a fit.
    pub fn is_valid(&self) -> bool {
        self.maturity.is_finite() && self.maturity > 0.0 && self.strength.is_finite()
    }
}

/// An ordered, validated collection of samples.
///
/// Invariants (checked on every construction path):
/// - at least [`MIN_SAMPLES`] samples
/// - every sample satisfies [`Sample::is_valid`]
///
/// Insertion order is preserved for display; the fit does not depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Sample>", into = "Vec<Sample>")]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    /// Build a set from already-coerced samples, rejecting any invalid entry.
    ///
    /// Unlike [`crate::io::validate_samples`], this does not drop entries: an
    /// invalid sample is an error here.
    pub fn new(samples: Vec<Sample>) -> Result<Self, CalibrationError> {
        if let Some((idx, bad)) = samples.iter().enumerate().find(|(_, s)| !s.is_valid()) {
            return Err(CalibrationError::InvalidInput(format!(
                "sample #{} has maturity={} strength={} (maturity must be > 0, both finite)",
                idx + 1,
                bad.maturity,
                bad.strength
            )));
        }
        if samples.len() < MIN_SAMPLES {
            return Err(CalibrationError::InsufficientData {
                found: samples.len(),
            });
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(min, max)` maturity over the set.
    pub fn maturity_range(&self) -> (f64, f64) {
        min_max(self.samples.iter().map(|s| s.maturity))
    }

    /// `(min, max)` strength over the set.
    pub fn strength_range(&self) -> (f64, f64) {
        min_max(self.samples.iter().map(|s| s.strength))
    }
}

impl TryFrom<Vec<Sample>> for SampleSet {
    type Error = CalibrationError;

    fn try_from(value: Vec<Sample>) -> Result<Self, Self::Error> {
        SampleSet::new(value)
    }
}

impl From<SampleSet> for Vec<Sample> {
    fn from(value: SampleSet) -> Self {
        value.samples
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Regression model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `strength = a + b·log10(maturity)` (ASTM C1074 convention).
    LogLinear,
    /// `strength = a + b·maturity`.
    Linear,
}

impl ModelKind {
    /// Human-readable label for terminal and report output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::LogLinear => "Log-linear",
            ModelKind::Linear => "Linear",
        }
    }

    /// Stable identifier used in the record store.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::LogLinear => "log_linear",
            ModelKind::Linear => "linear",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "log_linear" => Some(ModelKind::LogLinear),
            "linear" => Some(ModelKind::Linear),
            _ => None,
        }
    }

    /// Symbolic form of the regressor, used when printing equations.
    pub fn regressor_label(self) -> &'static str {
        match self {
            ModelKind::LogLinear => "log10(M)",
            ModelKind::Linear => "M",
        }
    }
}

/// Fitted regression parameters.
///
/// Naming is fixed everywhere (terminal, PDF, store): `a` is the intercept and
/// `b` is the slope, so `strength = a + b·x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model_kind: ModelKind,
    /// `a`
    pub intercept: f64,
    /// `b`
    pub slope: f64,
    pub r_squared: f64,
}

impl FitResult {
    /// Closed-form equation with fixed precision (3 decimals per coefficient).
    pub fn equation(&self) -> String {
        let sign = if self.slope < 0.0 { '-' } else { '+' };
        format!(
            "Strength = {:.3} {sign} {:.3}·{}",
            self.intercept,
            self.slope.abs(),
            self.model_kind.regressor_label()
        )
    }
}

/// A sample paired with its fitted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResidual {
    pub sample: Sample,
    pub fitted: f64,
    pub residual: f64,
}

/// Store-assigned identity of a calibration record.
pub type RecordId = i64;

/// A persisted calibration run with its full sample collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationRecord {
    pub id: RecordId,
    pub created_at: NaiveDateTime,
    pub title: String,
    pub fit: FitResult,
    pub samples: SampleSet,
}

/// List view of a calibration record (no samples).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub created_at: NaiveDateTime,
    pub title: String,
    pub fit: FitResult,
    pub sample_count: usize,
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub title: String,
    pub equation: String,
    pub fit: FitResult,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub maturity: Vec<f64>,
    pub strength: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_set_rejects_non_positive_maturity() {
        let err = SampleSet::new(vec![Sample::new(0.0, 1.0), Sample::new(10.0, 2.0)]).unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidInput(_)));
    }

    #[test]
    fn sample_set_requires_two_samples() {
        let err = SampleSet::new(vec![Sample::new(10.0, 2.0)]).unwrap_err();
        assert!(matches!(err, CalibrationError::InsufficientData { found: 1 }));
    }

    #[test]
    fn sample_set_deserialize_enforces_invariants() {
        let ok: SampleSet =
            serde_json::from_str(r#"[{"maturity":1.0,"strength":2.0},{"maturity":3.0,"strength":4.0}]"#)
                .unwrap();
        assert_eq!(ok.len(), 2);

        let bad = serde_json::from_str::<SampleSet>(r#"[{"maturity":-1.0,"strength":2.0}]"#);
        assert!(bad.is_err());
    }

    #[test]
    fn equation_uses_intercept_then_slope() {
        let fit = FitResult {
            model_kind: ModelKind::LogLinear,
            intercept: -40.4117,
            slope: 16.5718,
            r_squared: 0.99,
        };
        assert_eq!(fit.equation(), "Strength = -40.412 + 16.572·log10(M)");

        let falling = FitResult { slope: -2.0, ..fit };
        assert_eq!(falling.equation(), "Strength = -40.412 - 2.000·log10(M)");
    }

    #[test]
    fn model_kind_store_names_round_trip() {
        for kind in [ModelKind::LogLinear, ModelKind::Linear] {
            assert_eq!(ModelKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ModelKind::parse("ns"), None);
    }
}
