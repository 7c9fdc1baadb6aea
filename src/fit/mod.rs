//! Curve fitting.
//!
//! Responsibilities:
//!
//! - fit the log-linear or linear calibration curve (closed-form OLS)
//! - derive per-sample residuals and RMSE
//! - invert a fitted curve (maturity needed for a target strength)

pub mod fitter;

pub use fitter::*;
