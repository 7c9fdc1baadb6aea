//! Persistence of calibration runs.

pub mod result_store;

pub use result_store::*;
