//! Sample ingest and validation.
//!
//! This module is responsible for turning raw `(maturity, strength)` pairs, as
//! typed into a form or read from a CSV, into a clean `SampleSet` that is safe
//! to fit.
//!
//! Design goals:
//! - **Explicit schema** at the tabular boundary (`ColumnSchema`), independent
//!   of display labels
//! - **Row-level validation** (drop bad rows, but report what happened)
//! - **Order preserving** (surviving rows keep their relative order)
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::domain::{Sample, SampleSet};
use crate::error::{CalibrationError, MIN_SAMPLES, Result};

/// A single cell at the input boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Missing,
    Number(f64),
    Text(String),
    /// The enclosing row could not be decoded (e.g. invalid UTF-8).
    Unreadable,
}

impl RawValue {
    /// Coerce the cell to a finite number, if possible.
    ///
    /// Text is trimmed; a lone decimal comma (`"12,5"`) is accepted because
    /// spreadsheet exports in many locales use it.
    pub fn to_f64(&self) -> Option<f64> {
        let v = match self {
            RawValue::Missing | RawValue::Unreadable => return None,
            RawValue::Number(v) => *v,
            RawValue::Text(s) => parse_number(s)?,
        };
        v.is_finite().then_some(v)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            RawValue::Missing
        } else {
            RawValue::Text(value.to_string())
        }
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Missing, Into::into)
    }
}

/// One unvalidated input pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub maturity: RawValue,
    pub strength: RawValue,
}

impl RawSample {
    pub fn new(maturity: impl Into<RawValue>, strength: impl Into<RawValue>) -> Self {
        Self {
            maturity: maturity.into(),
            strength: strength.into(),
        }
    }

    /// A row that exists in the source but could not be decoded.
    pub fn unreadable() -> Self {
        Self {
            maturity: RawValue::Unreadable,
            strength: RawValue::Unreadable,
        }
    }
}

/// Why an input entry was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unreadable,
    MissingMaturity,
    InvalidMaturity,
    NonPositiveMaturity,
    MissingStrength,
    InvalidStrength,
}

impl RejectReason {
    pub fn describe(self) -> &'static str {
        match self {
            RejectReason::Unreadable => "row could not be read as CSV",
            RejectReason::MissingMaturity => "maturity is missing",
            RejectReason::InvalidMaturity => "maturity is not a number",
            RejectReason::NonPositiveMaturity => "maturity must be greater than zero",
            RejectReason::MissingStrength => "strength is missing",
            RejectReason::InvalidStrength => "strength is not a number",
        }
    }
}

/// An input entry that did not survive validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Zero-based position in the raw input.
    pub index: usize,
    pub reason: RejectReason,
}

/// Validator output: the usable samples plus what was dropped.
#[derive(Debug, Clone)]
pub struct Validated {
    pub samples: SampleSet,
    pub rejections: Vec<Rejection>,
    pub rows_read: usize,
}

/// Validate raw pairs into a `SampleSet`.
///
/// Entries with a missing/non-numeric value or a non-positive maturity are
/// dropped (never zeroed). Fails with `InsufficientData` when fewer than two
/// entries remain.
pub fn validate_samples(raw: &[RawSample]) -> Result<Validated> {
    let mut samples = Vec::with_capacity(raw.len());
    let mut rejections = Vec::new();

    for (index, entry) in raw.iter().enumerate() {
        match coerce(entry) {
            Ok(sample) => samples.push(sample),
            Err(reason) => {
                debug!(index, reason = reason.describe(), "dropping input row");
                rejections.push(Rejection { index, reason });
            }
        }
    }

    if samples.len() < MIN_SAMPLES {
        return Err(CalibrationError::InsufficientData {
            found: samples.len(),
        });
    }

    Ok(Validated {
        samples: SampleSet::new(samples)?,
        rejections,
        rows_read: raw.len(),
    })
}

fn coerce(entry: &RawSample) -> std::result::Result<Sample, RejectReason> {
    if entry.maturity == RawValue::Unreadable || entry.strength == RawValue::Unreadable {
        return Err(RejectReason::Unreadable);
    }
    let maturity = match &entry.maturity {
        RawValue::Missing => return Err(RejectReason::MissingMaturity),
        v => v.to_f64().ok_or(RejectReason::InvalidMaturity)?,
    };
    if maturity <= 0.0 {
        return Err(RejectReason::NonPositiveMaturity);
    }
    let strength = match &entry.strength {
        RawValue::Missing => return Err(RejectReason::MissingStrength),
        v => v.to_f64().ok_or(RejectReason::InvalidStrength)?,
    };
    Ok(Sample::new(maturity, strength))
}

/// Column names binding a tabular source to the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub maturity: String,
    pub strength: String,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            maturity: "maturity".to_string(),
            strength: "strength".to_string(),
        }
    }
}

/// Read raw pairs from CSV. Header matching is case-insensitive.
pub fn read_raw_samples_csv<R: Read>(reader: R, schema: &ColumnSchema) -> Result<Vec<RawSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| CalibrationError::InvalidInput(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let maturity_idx = column_index(&header_map, &schema.maturity)?;
    let strength_idx = column_index(&header_map, &schema.strength)?;

    let mut out = Vec::new();
    for result in reader.records() {
        // A malformed record still counts as a row; it is rejected downstream.
        let raw = match result {
            Ok(record) => RawSample {
                maturity: get_optional(&record, maturity_idx).into(),
                strength: get_optional(&record, strength_idx).into(),
            },
            Err(e) => {
                debug!(error = %e, "unreadable CSV record");
                RawSample::unreadable()
            }
        };
        out.push(raw);
    }
    Ok(out)
}

/// Load and validate a CSV file.
pub fn load_samples_csv(path: &Path, schema: &ColumnSchema) -> Result<Validated> {
    let file = File::open(path).map_err(|e| {
        CalibrationError::InvalidInput(format!("failed to open '{}': {e}", path.display()))
    })?;
    let raw = read_raw_samples_csv(file, schema)?;
    validate_samples(&raw)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn column_index(header_map: &HashMap<String, usize>, name: &str) -> Result<usize> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| CalibrationError::InvalidInput(format!("missing required column `{name}`")))
}

fn get_optional(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    if !s.contains('.') && s.matches(',').count() == 1 {
        return s.replace(',', ".").parse::<f64>().ok();
    }
    None
}
