//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - measurements (`Sample`, `SampleSet`)
//! - fit outputs (`ModelKind`, `FitResult`, `SampleResidual`)
//! - persisted records (`CalibrationRecord`, `RecordSummary`)
//! - the curve export schema (`CurveFile`)

pub mod types;

pub use types::*;
