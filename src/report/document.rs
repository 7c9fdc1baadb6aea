//! PDF calibration report.
//!
//! Layout (A4 portrait):
//!
//! - page 1: title, model/equation block, chart (observed points + fitted
//!   curve), then the first rows of the sample table
//! - following pages: the rest of the sample table
//! - every page: a page counter (bottom right) and the shared footer
//!   (bottom left)
//!
//! The document is a pure function of `(title, fit, samples)` except for the
//! generation timestamp. That timestamp lives in exactly one object, the
//! footer content stream, which is written last and has a fixed width. Two
//! renders that differ only in timestamp therefore have the same length and
//! the same bytes everywhere outside the footer.

use chrono::{Local, NaiveDateTime};
use tracing::debug;

use super::{CURVE_RESOLUTION, fitted_curve, observed_points};
use crate::domain::{
    FitResult, MATURITY_LABEL, STRENGTH_LABEL, SampleResidual, SampleSet, TIMESTAMP_FORMAT, effective_title,
};
use crate::error::{CalibrationError, Result};
use crate::fit::{residuals, rmse};
use crate::pdf::{ContentStream, ObjectId, PdfDocument, PdfError, StandardFont};

/// MIME type of the rendered report.
pub const REPORT_MIME: &str = "application/pdf";

const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN_LEFT: f64 = 50.0;
const MARGIN_RIGHT: f64 = 545.0;
const FOOTER_Y: f64 = 36.0;

/// Chart frame, in points.
const CHART_LEFT: f64 = 95.0;
const CHART_RIGHT: f64 = 540.0;
const CHART_BOTTOM: f64 = 395.0;
const CHART_TOP: f64 = 650.0;
const CHART_TICKS: usize = 6;

const TABLE_FONT_SIZE: f64 = 9.0;
const ROW_HEIGHT: f64 = 14.0;
const FIRST_PAGE_TABLE_TOP: f64 = 340.0;
const NEXT_PAGE_TABLE_TOP: f64 = 790.0;
const TABLE_BOTTOM: f64 = 64.0;

const TITLE_MAX_CHARS: usize = 60;

/// Render the report stamped with the current local time.
pub fn render_report_now(title: &str, fit: &FitResult, samples: &SampleSet) -> Result<Vec<u8>> {
    render_report(title, fit, samples, Local::now().naive_local())
}

/// Render the calibration report as a PDF byte stream.
pub fn render_report(
    title: &str,
    fit: &FitResult,
    samples: &SampleSet,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>> {
    check_preconditions(fit, samples)?;
    let title = effective_title(title);

    let rows = residuals(fit, samples);
    if rows.iter().any(|r| !r.fitted.is_finite()) {
        return Err(CalibrationError::Render(
            "fitted curve is not finite over the sample range".to_string(),
        ));
    }
    let curve = fitted_curve(fit, samples, CURVE_RESOLUTION);
    if curve.iter().any(|&(_, y)| !y.is_finite()) {
        return Err(CalibrationError::Render(
            "fitted curve is not finite over the sample range".to_string(),
        ));
    }

    let pages = paginate(&rows);
    let page_count = pages.len();

    let mut contents = Vec::with_capacity(page_count);
    for (page_idx, page_rows) in pages.iter().enumerate() {
        let mut c = ContentStream::new();
        let first_row = first_row_number(page_idx);
        if page_idx == 0 {
            draw_header(&mut c, title, fit, samples);
            draw_chart(&mut c, fit, samples, &curve);
            draw_table(&mut c, FIRST_PAGE_TABLE_TOP, first_row, page_rows);
        } else {
            draw_table(&mut c, NEXT_PAGE_TABLE_TOP, first_row, page_rows);
        }
        c.courier_right(
            8.0,
            MARGIN_RIGHT,
            FOOTER_Y,
            &format!("Page {} of {page_count}", page_idx + 1),
        );
        contents.push(c.into_bytes());
    }

    let footer = footer_stream(generated_at);
    let bytes = assemble(title, contents, &footer).map_err(|e| CalibrationError::Render(e.to_string()))?;

    debug!(
        pages = page_count,
        bytes = bytes.len(),
        samples = samples.len(),
        "rendered calibration report"
    );
    Ok(bytes)
}

fn check_preconditions(fit: &FitResult, samples: &SampleSet) -> Result<()> {
    if samples.is_empty() {
        return Err(CalibrationError::Render("sample set is empty".to_string()));
    }
    let params = [fit.intercept, fit.slope, fit.r_squared];
    if !params.iter().all(|v| v.is_finite()) {
        return Err(CalibrationError::Render(format!(
            "fit parameters are not finite (a={}, b={}, r2={})",
            fit.intercept, fit.slope, fit.r_squared
        )));
    }
    Ok(())
}

fn rows_per_page(top: f64) -> usize {
    ((top - ROW_HEIGHT - TABLE_BOTTOM) / ROW_HEIGHT).floor() as usize + 1
}

fn first_row_number(page_idx: usize) -> usize {
    if page_idx == 0 {
        1
    } else {
        1 + rows_per_page(FIRST_PAGE_TABLE_TOP) + (page_idx - 1) * rows_per_page(NEXT_PAGE_TABLE_TOP)
    }
}

/// Split table rows over pages. Always returns at least one page.
fn paginate(rows: &[SampleResidual]) -> Vec<&[SampleResidual]> {
    let first = rows_per_page(FIRST_PAGE_TABLE_TOP).min(rows.len());
    let mut pages = vec![&rows[..first]];
    pages.extend(rows[first..].chunks(rows_per_page(NEXT_PAGE_TABLE_TOP)));
    pages
}

fn draw_header(c: &mut ContentStream, title: &str, fit: &FitResult, samples: &SampleSet) {
    let title = clip(title, TITLE_MAX_CHARS);
    c.text(StandardFont::HelveticaBold, 18.0, MARGIN_LEFT, 792.0, &title);
    c.text(
        StandardFont::Helvetica,
        10.0,
        MARGIN_LEFT,
        775.0,
        "Strength-maturity relationship (ASTM C1074, Nurse-Saul method)",
    );
    c.line_width(0.5);
    c.line(MARGIN_LEFT, 766.0, MARGIN_RIGHT, 766.0);

    c.text(
        StandardFont::Helvetica,
        11.0,
        MARGIN_LEFT,
        748.0,
        &format!("Model: {}", fit.model_kind.display_name()),
    );
    c.text(StandardFont::HelveticaBold, 12.0, MARGIN_LEFT, 731.0, &fit.equation());
    c.text(
        StandardFont::Helvetica,
        11.0,
        MARGIN_LEFT,
        714.0,
        &format!("a (intercept) = {:.3}      b (slope) = {:.3}", fit.intercept, fit.slope),
    );
    c.text(
        StandardFont::Helvetica,
        11.0,
        MARGIN_LEFT,
        697.0,
        &format!(
            "R² = {:.4}      n = {}      RMSE = {:.3} MPa",
            fit.r_squared,
            samples.len(),
            rmse(fit, samples)
        ),
    );
}

/// Linear mapping from data space to the chart frame.
struct Axes {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Axes {
    fn px(&self, x: f64) -> f64 {
        CHART_LEFT + (x - self.x_min) / (self.x_max - self.x_min) * (CHART_RIGHT - CHART_LEFT)
    }

    fn py(&self, y: f64) -> f64 {
        CHART_BOTTOM + (y - self.y_min) / (self.y_max - self.y_min) * (CHART_TOP - CHART_BOTTOM)
    }
}

fn chart_axes(samples: &SampleSet, curve: &[(f64, f64)]) -> Axes {
    let (m_lo, m_hi) = samples.maturity_range();
    let (s_lo, s_hi) = samples.strength_range();
    let (c_lo, c_hi) = curve
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));

    let (x_min, x_max) = pad_range(m_lo, m_hi, 0.04);
    let (y_min, y_max) = pad_range(s_lo.min(c_lo), s_hi.max(c_hi), 0.08);
    Axes {
        x_min,
        x_max,
        y_min,
        y_max,
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = max - min;
    let pad = if span > 0.0 {
        span * frac
    } else {
        (min.abs() * 0.1).max(1.0)
    };
    (min - pad, max + pad)
}

fn draw_chart(c: &mut ContentStream, fit: &FitResult, samples: &SampleSet, curve: &[(f64, f64)]) {
    let axes = chart_axes(samples, curve);

    c.save();
    c.line_width(0.8);
    c.stroke_rgb(0.0, 0.0, 0.0);
    c.stroke_rect(CHART_LEFT, CHART_BOTTOM, CHART_RIGHT - CHART_LEFT, CHART_TOP - CHART_BOTTOM);

    // Ticks, grid and labels.
    c.line_width(0.3);
    for i in 0..CHART_TICKS {
        let u = i as f64 / (CHART_TICKS - 1) as f64;

        let xv = axes.x_min + u * (axes.x_max - axes.x_min);
        let x = axes.px(xv);
        c.line(x, CHART_BOTTOM, x, CHART_BOTTOM - 4.0);
        c.courier_centered(7.5, x, CHART_BOTTOM - 13.0, &format!("{xv:.0}"));

        let yv = axes.y_min + u * (axes.y_max - axes.y_min);
        let y = axes.py(yv);
        c.line(CHART_LEFT - 4.0, y, CHART_LEFT, y);
        c.courier_right(7.5, CHART_LEFT - 6.0, y - 2.5, &format!("{yv:.1}"));

        if i > 0 && i < CHART_TICKS - 1 {
            c.save();
            c.stroke_rgb(0.8, 0.8, 0.8);
            c.dash(2.0, 2.0);
            c.line(x, CHART_BOTTOM, x, CHART_TOP);
            c.line(CHART_LEFT, y, CHART_RIGHT, y);
            c.restore();
        }
    }
    c.text(
        StandardFont::Helvetica,
        9.0,
        (CHART_LEFT + CHART_RIGHT) / 2.0 - 32.0,
        CHART_BOTTOM - 28.0,
        MATURITY_LABEL,
    );
    c.text_vertical(
        StandardFont::Helvetica,
        9.0,
        CHART_LEFT - 42.0,
        (CHART_BOTTOM + CHART_TOP) / 2.0 - 30.0,
        STRENGTH_LABEL,
    );

    // Fitted curve.
    let path: Vec<(f64, f64)> = curve.iter().map(|&(x, y)| (axes.px(x), axes.py(y))).collect();
    c.line_width(1.2);
    c.stroke_rgb(0.0, 0.35, 0.75);
    c.polyline(&path);

    // Observed points.
    c.fill_rgb(0.8, 0.1, 0.1);
    for (x, y) in observed_points(samples) {
        c.fill_rect(axes.px(x) - 2.0, axes.py(y) - 2.0, 4.0, 4.0);
    }

    // Legend.
    let legend_y = CHART_TOP + 10.0;
    c.fill_rect(CHART_LEFT, legend_y, 4.0, 4.0);
    c.fill_rgb(0.0, 0.0, 0.0);
    c.text(StandardFont::Helvetica, 8.0, CHART_LEFT + 8.0, legend_y, "Observed");
    c.line(CHART_LEFT + 60.0, legend_y + 2.0, CHART_LEFT + 80.0, legend_y + 2.0);
    c.text(
        StandardFont::Helvetica,
        8.0,
        CHART_LEFT + 84.0,
        legend_y,
        &format!("Fitted ({})", fit.model_kind.display_name().to_lowercase()),
    );
    c.restore();
}

fn table_line(cells: [&str; 5]) -> String {
    format!(
        "{:>4}  {:>16}  {:>15}  {:>13}  {:>15}",
        cells[0], cells[1], cells[2], cells[3], cells[4]
    )
}

fn draw_table(c: &mut ContentStream, top: f64, first_row: usize, rows: &[SampleResidual]) {
    let header = table_line(["#", MATURITY_LABEL, STRENGTH_LABEL, "Fitted (MPa)", "Residual (MPa)"]);
    c.text(StandardFont::Courier, TABLE_FONT_SIZE, MARGIN_LEFT, top, &header);
    c.line_width(0.5);
    c.line(MARGIN_LEFT, top - 4.0, MARGIN_RIGHT, top - 4.0);

    for (i, r) in rows.iter().enumerate() {
        let y = top - ROW_HEIGHT * (i as f64 + 1.0);
        let line = table_line([
            &(first_row + i).to_string(),
            &format!("{:.1}", r.sample.maturity),
            &format!("{:.2}", r.sample.strength),
            &format!("{:.2}", r.fitted),
            &format!("{:.2}", r.residual),
        ]);
        c.text(StandardFont::Courier, TABLE_FONT_SIZE, MARGIN_LEFT, y, &line);
    }
}

fn footer_stream(generated_at: NaiveDateTime) -> Vec<u8> {
    let mut c = ContentStream::new();
    c.text(
        StandardFont::Helvetica,
        8.0,
        MARGIN_LEFT,
        FOOTER_Y,
        &format!("Generated {}", generated_at.format(TIMESTAMP_FORMAT)),
    );
    c.into_bytes()
}

/// Build the object graph. The footer is reserved last so it is the final object.
fn assemble(title: &str, contents: Vec<Vec<u8>>, footer: &[u8]) -> std::result::Result<Vec<u8>, PdfError> {
    let mut doc = PdfDocument::new();
    let catalog = doc.reserve();
    let pages_root = doc.reserve();

    let fonts: Vec<(StandardFont, ObjectId)> = StandardFont::ALL
        .iter()
        .map(|&f| (f, doc.add(PdfDocument::font_body(f))))
        .collect();
    let font_resources: String = fonts
        .iter()
        .map(|(f, id)| format!("/{} {id}", f.resource_name()))
        .collect::<Vec<_>>()
        .join(" ");

    let page_ids: Vec<ObjectId> = contents.iter().map(|_| doc.reserve()).collect();
    let content_ids: Vec<ObjectId> = contents.iter().map(|data| doc.add_stream(data)).collect();
    let info = doc.add(info_body(title));
    let footer_id = doc.reserve();

    for (page, content) in page_ids.iter().zip(&content_ids) {
        doc.set(
            *page,
            format!(
                "<< /Type /Page /Parent {pages_root} /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
                 /Resources << /Font << {font_resources} >> >> /Contents [{content} {footer_id}] >>"
            ),
        )?;
    }

    let kids: Vec<String> = page_ids.iter().map(ToString::to_string).collect();
    doc.set(
        pages_root,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), page_ids.len()),
    )?;
    doc.set(catalog, format!("<< /Type /Catalog /Pages {pages_root} >>"))?;
    doc.set(footer_id, PdfDocument::stream_body(footer))?;

    doc.finish(catalog, Some(info))
}

fn info_body(title: &str) -> Vec<u8> {
    let mut body = b"<< /Title (".to_vec();
    body.extend_from_slice(&crate::pdf::encode_literal(title));
    body.extend_from_slice(b") /Producer (mcal) >>");
    body
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}
