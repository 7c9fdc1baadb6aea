//! Reporting: chart series, terminal tables and the PDF report.
//!
//! We keep presentation code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (the PDF and terminal share labels)

pub mod document;
pub mod format;

pub use document::*;
pub use format::*;

use crate::domain::{FitResult, SampleSet};
use crate::models::predict;

/// Number of evenly spaced points used to draw the fitted curve.
pub const CURVE_RESOLUTION: usize = 150;

/// Observed `(maturity, strength)` points, in sample order.
pub fn observed_points(samples: &SampleSet) -> Vec<(f64, f64)> {
    samples.iter().map(|s| (s.maturity, s.strength)).collect()
}

/// The fitted curve evaluated at `n` evenly spaced maturities spanning
/// `[min(maturity), max(maturity)]`, endpoints included.
pub fn fitted_curve(fit: &FitResult, samples: &SampleSet, n: usize) -> Vec<(f64, f64)> {
    let (lo, hi) = samples.maturity_range();
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let m = if i == n - 1 {
                hi
            } else {
                lo + (i as f64 / (n as f64 - 1.0)) * (hi - lo)
            };
            (m, predict(fit, m))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, Sample};

    #[test]
    fn curve_spans_observed_range() {
        let samples = SampleSet::new(vec![
            Sample::new(1500.0, 12.0),
            Sample::new(500.0, 5.0),
            Sample::new(30000.0, 35.0),
        ])
        .unwrap();
        let fit = FitResult {
            model_kind: ModelKind::Linear,
            intercept: 1.0,
            slope: 0.001,
            r_squared: 0.9,
        };

        let curve = fitted_curve(&fit, &samples, CURVE_RESOLUTION);
        assert_eq!(curve.len(), CURVE_RESOLUTION);
        assert_eq!(curve[0].0, 500.0);
        assert_eq!(curve[CURVE_RESOLUTION - 1].0, 30000.0);
        assert!(curve.windows(2).all(|w| w[1].0 > w[0].0));

        let points = observed_points(&samples);
        assert_eq!(points, vec![(1500.0, 12.0), (500.0, 5.0), (30000.0, 35.0)]);
    }
}
