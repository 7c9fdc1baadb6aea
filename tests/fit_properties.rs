//! Property tests for the least-squares fitter.
//!
//! For any non-degenerate sample set:
//! 1. residuals satisfy the OLS normal equations (Σr = 0, Σr·x = 0)
//! 2. R² is finite and inside [0, 1]
//! 3. refitting the same input is bit-identical

use maturity_calibration::domain::{ModelKind, Sample, SampleSet};
use maturity_calibration::fit::{fit_samples, residuals};
use maturity_calibration::models::regressor;
use proptest::prelude::*;

fn sample_sets() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((1.0f64..1.0e5, -10.0f64..80.0), 2..40)
}

fn models() -> impl Strategy<Value = ModelKind> {
    prop_oneof![Just(ModelKind::LogLinear), Just(ModelKind::Linear)]
}

fn build(pairs: &[(f64, f64)]) -> SampleSet {
    SampleSet::new(pairs.iter().map(|&(m, s)| Sample::new(m, s)).collect()).unwrap()
}

/// Keep sets whose maturities are clearly spread out.
fn well_spread(pairs: &[(f64, f64)]) -> bool {
    let lo = pairs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let hi = pairs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    hi / lo > 1.01
}

proptest! {
    #[test]
    fn residuals_satisfy_normal_equations(pairs in sample_sets(), model in models()) {
        prop_assume!(well_spread(&pairs));
        let samples = build(&pairs);
        let fit = fit_samples(&samples, model).unwrap();
        let rows = residuals(&fit, &samples);

        let x_max = samples.iter().map(|s| regressor(model, s.maturity).abs()).fold(1.0, f64::max);
        let scale = rows.len() as f64 * 90.0 * x_max;

        let sum_r: f64 = rows.iter().map(|r| r.residual).sum();
        let sum_rx: f64 = rows
            .iter()
            .map(|r| r.residual * regressor(model, r.sample.maturity))
            .sum();

        prop_assert!(sum_r.abs() <= 1e-8 * scale, "sum_r={sum_r}");
        prop_assert!(sum_rx.abs() <= 1e-8 * scale * x_max, "sum_rx={sum_rx}");
    }

    #[test]
    fn r_squared_is_a_fraction(pairs in sample_sets(), model in models()) {
        prop_assume!(well_spread(&pairs));
        let fit = fit_samples(&build(&pairs), model).unwrap();
        prop_assert!(fit.r_squared.is_finite());
        prop_assert!((0.0..=1.0).contains(&fit.r_squared));
        prop_assert!(fit.intercept.is_finite() && fit.slope.is_finite());
    }

    #[test]
    fn refit_is_bit_identical(pairs in sample_sets(), model in models()) {
        prop_assume!(well_spread(&pairs));
        let samples = build(&pairs);
        let a = fit_samples(&samples, model).unwrap();
        let b = fit_samples(&samples.clone(), model).unwrap();
        prop_assert_eq!(a.intercept.to_bits(), b.intercept.to_bits());
        prop_assert_eq!(a.slope.to_bits(), b.slope.to_bits());
        prop_assert_eq!(a.r_squared.to_bits(), b.r_squared.to_bits());
    }
}

#[test]
fn astm_scenario_matches_reference_values() {
    let samples = build(&[(500.0, 5.0), (1500.0, 12.0), (5000.0, 20.0), (15000.0, 28.0), (30000.0, 35.0)]);
    let fit = fit_samples(&samples, ModelKind::LogLinear).unwrap();
    // Closed-form OLS in a fixed operation order reproduces these exactly.
    assert_eq!(fit.intercept.to_bits(), (-40.41169281398126_f64).to_bits(), "a={}", fit.intercept);
    assert_eq!(fit.slope.to_bits(), 16.57181237551857_f64.to_bits(), "b={}", fit.slope);
    assert_eq!(fit.r_squared.to_bits(), 0.9940870803701052_f64.to_bits(), "r2={}", fit.r_squared);
}
