//! Model evaluation for the log-linear and linear calibration curves.
//!
//! The fitter relies on two primitive operations:
//! - map a maturity to the model's regressor `x` (for OLS)
//! - predict strength given fitted coefficients (for residuals/plots/reports)
//!
//! Both are implemented here for each model kind.

use crate::domain::{FitResult, ModelKind};

/// Map a maturity to the regressor used by `model`.
///
/// Callers pass validated maturities (`> 0`), so the log transform is finite.
pub fn regressor(model: ModelKind, maturity: f64) -> f64 {
    match model {
        ModelKind::LogLinear => maturity.log10(),
        ModelKind::Linear => maturity,
    }
}

/// Inverse of [`regressor`]: the maturity corresponding to regressor value `x`.
pub fn maturity_from_regressor(model: ModelKind, x: f64) -> f64 {
    match model {
        ModelKind::LogLinear => 10f64.powf(x),
        ModelKind::Linear => x,
    }
}

/// Predict strength at `maturity` for the given fit.
pub fn predict(fit: &FitResult, maturity: f64) -> f64 {
    fit.intercept + fit.slope * regressor(fit.model_kind, maturity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_linear_uses_decimal_log() {
        let fit = FitResult {
            model_kind: ModelKind::LogLinear,
            intercept: -5.0,
            slope: 10.0,
            r_squared: 1.0,
        };
        assert_eq!(predict(&fit, 100.0), 15.0);
    }

    #[test]
    fn regressor_round_trip() {
        for model in [ModelKind::LogLinear, ModelKind::Linear] {
            let m = 1234.5;
            let back = maturity_from_regressor(model, regressor(model, m));
            assert!((back - m).abs() < 1e-9, "{model:?}: {back}");
        }
    }
}
