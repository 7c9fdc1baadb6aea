//! Curve fitting over a validated sample set.
//!
//! Given:
//! - a `SampleSet` (at least two samples, positive maturities)
//! - a `ModelKind`
//!
//! we map each maturity to the model's regressor, solve the closed-form OLS
//! problem and return `(a, b, R²)`. A fixed input always yields bit-identical
//! output.

use tracing::debug;

use crate::domain::{FitResult, ModelKind, SampleResidual, SampleSet};
use crate::error::{CalibrationError, Result};
use crate::math::{OlsFailure, fit_line};
use crate::models::{maturity_from_regressor, predict, regressor};

/// Fit `model` to `samples`.
pub fn fit_samples(samples: &SampleSet, model: ModelKind) -> Result<FitResult> {
    let x: Vec<f64> = samples.iter().map(|s| regressor(model, s.maturity)).collect();
    let y: Vec<f64> = samples.iter().map(|s| s.strength).collect();

    let line = fit_line(&x, &y).map_err(|failure| match failure {
        OlsFailure::TooFewPoints => CalibrationError::InsufficientData { found: samples.len() },
        OlsFailure::ConstantRegressor => CalibrationError::DegenerateFit(format!(
            "all {} samples share the same maturity",
            samples.len()
        )),
        OlsFailure::NonFinite => {
            CalibrationError::DegenerateFit("regression produced non-finite values".to_string())
        }
    })?;

    debug!(
        model = model.as_str(),
        n = samples.len(),
        intercept = line.intercept,
        slope = line.slope,
        r_squared = line.r_squared,
        "fitted calibration curve"
    );

    Ok(FitResult {
        model_kind: model,
        intercept: line.intercept,
        slope: line.slope,
        r_squared: line.r_squared,
    })
}

/// Fitted value and residual for each sample, in sample order.
pub fn residuals(fit: &FitResult, samples: &SampleSet) -> Vec<SampleResidual> {
    samples
        .iter()
        .map(|&sample| {
            let fitted = predict(fit, sample.maturity);
            SampleResidual {
                sample,
                fitted,
                residual: sample.strength - fitted,
            }
        })
        .collect()
}

/// Root-mean-square residual (MPa).
pub fn rmse(fit: &FitResult, samples: &SampleSet) -> f64 {
    let rows = residuals(fit, samples);
    let sse: f64 = rows.iter().map(|r| r.residual * r.residual).sum();
    (sse / rows.len().max(1) as f64).sqrt()
}

/// Maturity at which the calibration predicts `target_strength`.
pub fn required_maturity(fit: &FitResult, target_strength: f64) -> Result<f64> {
    if !target_strength.is_finite() {
        return Err(CalibrationError::InvalidInput(
            "target strength must be a finite number".to_string(),
        ));
    }
    if fit.slope == 0.0 || !fit.slope.is_finite() {
        return Err(CalibrationError::DegenerateFit(
            "a flat calibration curve cannot be inverted".to_string(),
        ));
    }

    let x = (target_strength - fit.intercept) / fit.slope;
    let maturity = maturity_from_regressor(fit.model_kind, x);
    if !(maturity.is_finite() && maturity > 0.0) {
        return Err(CalibrationError::DegenerateFit(format!(
            "no positive finite maturity reaches {target_strength:.3} MPa on this curve"
        )));
    }
    Ok(maturity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sample;

    fn set(pairs: &[(f64, f64)]) -> SampleSet {
        SampleSet::new(pairs.iter().map(|&(m, s)| Sample::new(m, s)).collect()).unwrap()
    }

    fn reference_set() -> SampleSet {
        set(&[
            (500.0, 5.0),
            (1500.0, 12.0),
            (5000.0, 20.0),
            (15000.0, 28.0),
            (30000.0, 35.0),
        ])
    }

    #[test]
    fn reference_log_linear_fit() {
        let fit = fit_samples(&reference_set(), ModelKind::LogLinear).unwrap();
        assert_eq!(fit.intercept.to_bits(), (-40.41169281398126_f64).to_bits(), "a={}", fit.intercept);
        assert_eq!(fit.slope.to_bits(), 16.57181237551857_f64.to_bits(), "b={}", fit.slope);
        assert_eq!(fit.r_squared.to_bits(), 0.9940870803701052_f64.to_bits(), "r2={}", fit.r_squared);
    }

    #[test]
    fn reference_linear_fit() {
        let fit = fit_samples(&reference_set(), ModelKind::Linear).unwrap();
        assert_eq!(fit.intercept.to_bits(), 10.640510053948013_f64.to_bits());
        assert_eq!(fit.slope.to_bits(), 0.0008999509563511525_f64.to_bits());
        assert_eq!(fit.r_squared.to_bits(), 0.8571332205385976_f64.to_bits());
    }

    #[test]
    fn refit_is_bit_identical() {
        let samples = reference_set();
        let first = fit_samples(&samples, ModelKind::LogLinear).unwrap();
        let second = fit_samples(&samples.clone(), ModelKind::LogLinear).unwrap();
        assert_eq!(first.intercept.to_bits(), second.intercept.to_bits());
        assert_eq!(first.slope.to_bits(), second.slope.to_bits());
        assert_eq!(first.r_squared.to_bits(), second.r_squared.to_bits());
    }

    #[test]
    fn two_points_fit_exactly() {
        let fit = fit_samples(&set(&[(10.0, 5.0), (100.0, 15.0)]), ModelKind::LogLinear).unwrap();
        assert_eq!(fit.slope, 10.0);
        assert_eq!(fit.intercept, -5.0);
        assert_eq!(fit.r_squared, 1.0);

        let fit = fit_samples(&set(&[(1.0, 2.0), (3.0, 8.0)]), ModelKind::Linear).unwrap();
        assert_eq!(fit.r_squared, 1.0);
    }

    #[test]
    fn identical_maturities_are_degenerate() {
        let err = fit_samples(&set(&[(700.0, 5.0), (700.0, 9.0), (700.0, 13.0)]), ModelKind::LogLinear)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::DegenerateFit(_)), "{err:?}");
    }

    #[test]
    fn residuals_follow_sample_order() {
        let samples = reference_set();
        let fit = fit_samples(&samples, ModelKind::LogLinear).unwrap();
        let rows = residuals(&fit, &samples);
        assert_eq!(rows.len(), 5);
        for (row, sample) in rows.iter().zip(samples.iter()) {
            assert_eq!(row.sample, *sample);
            assert!((row.fitted + row.residual - sample.strength).abs() < 1e-12);
        }
        // OLS residuals with an intercept sum to zero.
        let total: f64 = rows.iter().map(|r| r.residual).sum();
        assert!(total.abs() < 1e-9);
        assert!(rmse(&fit, &samples) > 0.0);
    }

    #[test]
    fn required_maturity_inverts_the_curve() {
        let fit = fit_samples(&reference_set(), ModelKind::LogLinear).unwrap();
        let m = required_maturity(&fit, 25.0).unwrap();
        assert!((predict(&fit, m) - 25.0).abs() < 1e-9);
        assert!(m > 5000.0 && m < 15000.0, "{m}");
    }

    #[test]
    fn required_maturity_rejects_flat_curve() {
        let flat = FitResult {
            model_kind: ModelKind::Linear,
            intercept: 3.0,
            slope: 0.0,
            r_squared: 0.0,
        };
        assert!(matches!(
            required_maturity(&flat, 10.0),
            Err(CalibrationError::DegenerateFit(_))
        ));
    }

    #[test]
    fn required_maturity_rejects_negative_linear_maturity() {
        let fit = FitResult {
            model_kind: ModelKind::Linear,
            intercept: 10.0,
            slope: 1.0,
            r_squared: 1.0,
        };
        assert!(required_maturity(&fit, 5.0).is_err());
    }
}
