//! `maturity-calibration` library crate.
//!
//! Strength-maturity calibration for concrete (ASTM C1074): validate paired
//! measurements, fit a log-linear or linear curve, render a PDF report and
//! keep an append-only record of calibrations.
//!
//! The binary (`mcal`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the validator, fitter, renderer and store can be used independently

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod pdf;
pub mod plot;
pub mod report;
pub mod store;
pub mod telemetry;
