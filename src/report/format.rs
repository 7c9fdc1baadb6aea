//! Formatted terminal output: fit summary, sample table, stored records.

use crate::domain::{
    CalibrationRecord, FitResult, MATURITY_LABEL, RecordSummary, STRENGTH_LABEL, SampleResidual, SampleSet,
    TIMESTAMP_FORMAT,
};
use crate::fit::{residuals, rmse};
use crate::io::Rejection;

/// Format the fit summary (model, equation, goodness of fit, rejected rows).
pub fn format_fit_summary(title: &str, fit: &FitResult, samples: &SampleSet, rejections: &[Rejection]) -> String {
    let mut out = String::new();

    out.push_str("=== mcal - maturity calibration (ASTM C1074) ===\n");
    if !title.is_empty() {
        out.push_str(&format!("Title: {title}\n"));
    }
    let (m_lo, m_hi) = samples.maturity_range();
    out.push_str(&format!(
        "Samples: n={} | maturity=[{m_lo:.1}, {m_hi:.1}] °C·h\n",
        samples.len()
    ));
    for r in rejections {
        out.push_str(&format!("  (skipped row {}) {}\n", r.index + 1, r.reason.describe()));
    }

    out.push_str("\nFit:\n");
    out.push_str(&format!("- model    : {}\n", fit.model_kind.display_name()));
    out.push_str(&format!("- equation : {}\n", fit.equation()));
    out.push_str(&format!("- a (intercept) = {:.3}\n", fit.intercept));
    out.push_str(&format!("- b (slope)     = {:.3}\n", fit.slope));
    out.push_str(&format!("- R²   = {:.4}\n", fit.r_squared));
    out.push_str(&format!("- RMSE = {:.3} MPa\n", rmse(fit, samples)));
    out.push('\n');

    out
}

/// Format the per-sample table (observed, fitted, residual).
pub fn format_sample_table(fit: &FitResult, samples: &SampleSet) -> String {
    format_residual_rows(&residuals(fit, samples))
}

fn format_residual_rows(rows: &[SampleResidual]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:>16} {:>15} {:>12} {:>12}\n",
            "#", MATURITY_LABEL, STRENGTH_LABEL, "fitted", "residual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<16} {:-<15} {:-<12} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for (i, r) in rows.iter().enumerate() {
        out.push_str(
            format!(
                "{:>4} {:>16.1} {:>15.2} {:>12.2} {:>12.2}\n",
                i + 1,
                r.sample.maturity,
                r.sample.strength,
                r.fitted,
                r.residual,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format the stored-record listing.
pub fn format_record_list(records: &[RecordSummary]) -> String {
    if records.is_empty() {
        return "No saved calibrations.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(
        format!(
            "{:>5} {:<19} {:<28} {:<10} {:>3} {:>9} {:>9} {:>7}\n",
            "id", "created_at", "title", "model", "n", "a", "b", "R²"
        )
        .trim_end(),
    );
    out.push('\n');
    for r in records {
        out.push_str(
            format!(
                "{:>5} {:<19} {:<28} {:<10} {:>3} {:>9.3} {:>9.3} {:>7.4}\n",
                r.id,
                r.created_at.format(TIMESTAMP_FORMAT).to_string(),
                truncate(&r.title, 28),
                r.fit.model_kind.display_name(),
                r.sample_count,
                r.fit.intercept,
                r.fit.slope,
                r.fit.r_squared,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Format one stored record with its samples.
pub fn format_record(record: &CalibrationRecord) -> String {
    let mut out = format!(
        "Record {} | saved {}\n",
        record.id,
        record.created_at.format(TIMESTAMP_FORMAT)
    );
    out.push_str(&format_fit_summary(&record.title, &record.fit, &record.samples, &[]));
    out.push_str(&format_sample_table(&record.fit, &record.samples));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
