//! Closed-form ordinary least squares for a single regressor.
//!
//! We solve
//!
//! ```text
//! minimize Σ (y_i - (a + b·x_i))^2
//! ```
//!
//! with the textbook two-pass formulas:
//!
//! - `b = Sxy / Sxx`
//! - `a = mean(y) - b·mean(x)`
//!
//! where `Sxx`, `Sxy` and `Syy` are sums of mean-centred products. Centring
//! first keeps the sums well conditioned when `x` sits far from zero (raw
//! maturities are in the thousands). Every sum runs in input order, so the
//! result is bit-for-bit reproducible for a given input.

/// Output of a simple linear regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    /// Coefficient of determination, in `[0, 1]`.
    pub r_squared: f64,
    /// Residual sum of squares.
    pub ss_res: f64,
    /// Total sum of squares of the response.
    pub ss_tot: f64,
}

/// Why a regression could not be solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlsFailure {
    /// Fewer than two observations, or mismatched lengths.
    TooFewPoints,
    /// All regressor values are identical (zero variance).
    ConstantRegressor,
    /// An input or intermediate value was NaN/Inf.
    NonFinite,
}

/// Fit `y = a + b·x` by ordinary least squares.
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LineFit, OlsFailure> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(OlsFailure::TooFewPoints);
    }
    if !x.iter().chain(y.iter()).all(|v| v.is_finite()) {
        return Err(OlsFailure::NonFinite);
    }
    if is_constant(x) {
        return Err(OlsFailure::ConstantRegressor);
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if !(sxx.is_finite() && sxy.is_finite() && syy.is_finite()) {
        return Err(OlsFailure::NonFinite);
    }
    if sxx <= 0.0 {
        return Err(OlsFailure::ConstantRegressor);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !(slope.is_finite() && intercept.is_finite()) {
        return Err(OlsFailure::NonFinite);
    }

    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - (intercept + slope * xi);
            r * r
        })
        .sum();

    // A constant response has no variance to explain; R² is pinned to 0.
    let r_squared = if is_constant(y) || syy == 0.0 {
        0.0
    } else {
        (1.0 - ss_res / syy).clamp(0.0, 1.0)
    };

    if !(ss_res.is_finite() && r_squared.is_finite()) {
        return Err(OlsFailure::NonFinite);
    }

    Ok(LineFit {
        intercept,
        slope,
        r_squared,
        ss_res,
        ss_tot: syy,
    })
}

/// True when the spread of `values` is below floating-point resolution of
/// their magnitude.
fn is_constant(values: &[f64]) -> bool {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let scale = lo.abs().max(hi.abs()).max(1.0);
    hi - lo <= f64::EPSILON * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_exact_line() {
        // y = 2 + 3x on x = [0,1,2]
        let fit = fit_line(&[0.0, 1.0, 2.0], &[2.0, 5.0, 8.0]).unwrap();
        assert!((fit.intercept - 2.0).abs() < 1e-12);
        assert!((fit.slope - 3.0).abs() < 1e-12);
        assert_eq!(fit.r_squared, 1.0);
    }

    #[test]
    fn constant_regressor_is_rejected() {
        assert_eq!(
            fit_line(&[0.1, 0.1, 0.1], &[1.0, 2.0, 3.0]),
            Err(OlsFailure::ConstantRegressor)
        );
    }

    #[test]
    fn constant_response_has_zero_r_squared() {
        let fit = fit_line(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        assert_eq!(fit_line(&[1.0, f64::NAN], &[1.0, 2.0]), Err(OlsFailure::NonFinite));
    }

    #[test]
    fn overflowing_sums_are_non_finite() {
        // Deviations around 1e200 square past f64::MAX.
        assert_eq!(
            fit_line(&[1e200, -1e200, 3e200], &[1.0, 2.0, 3.0]),
            Err(OlsFailure::NonFinite)
        );
        assert_eq!(
            fit_line(&[1.0, 2.0, 3.0], &[1e200, -1e200, 3e200]),
            Err(OlsFailure::NonFinite)
        );
    }

    #[test]
    fn too_few_points() {
        assert_eq!(fit_line(&[1.0], &[1.0]), Err(OlsFailure::TooFewPoints));
        assert_eq!(fit_line(&[1.0, 2.0], &[1.0]), Err(OlsFailure::TooFewPoints));
    }
}
