//! Content stream builder.
//!
//! Coordinates are PDF user space (points, origin bottom-left). All numbers
//! are written with two decimals so output does not depend on float
//! formatting heuristics.

use super::StandardFont;

/// Width of one Courier glyph, in units of the font size.
pub const COURIER_ADVANCE: f64 = 0.6;

/// Append-only buffer of page drawing operators.
#[derive(Debug, Default, Clone)]
pub struct ContentStream {
    buf: Vec<u8>,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn op(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(b'\n');
    }

    /// Draw `text` with its baseline starting at `(x, y)`.
    pub fn text(&mut self, font: StandardFont, size: f64, x: f64, y: f64, text: &str) {
        self.op(&format!("BT /{} {size:.2} Tf {x:.2} {y:.2} Td", font.resource_name()));
        self.show(text);
        self.op("ET");
    }

    /// Draw `text` rotated 90° counter-clockwise, baseline starting at `(x, y)`.
    pub fn text_vertical(&mut self, font: StandardFont, size: f64, x: f64, y: f64, text: &str) {
        self.op(&format!(
            "BT /{} {size:.2} Tf 0 1 -1 0 {x:.2} {y:.2} Tm",
            font.resource_name()
        ));
        self.show(text);
        self.op("ET");
    }

    /// Courier text whose right edge ends at `right`.
    pub fn courier_right(&mut self, size: f64, right: f64, y: f64, text: &str) {
        let x = right - courier_width(text, size);
        self.text(StandardFont::Courier, size, x, y, text);
    }

    /// Courier text centred on `center`.
    pub fn courier_centered(&mut self, size: f64, center: f64, y: f64, text: &str) {
        let x = center - courier_width(text, size) / 2.0;
        self.text(StandardFont::Courier, size, x, y, text);
    }

    fn show(&mut self, text: &str) {
        self.buf.push(b'(');
        self.buf.extend_from_slice(&encode_literal(text));
        self.buf.extend_from_slice(b") Tj\n");
    }

    pub fn save(&mut self) {
        self.op("q");
    }

    pub fn restore(&mut self) {
        self.op("Q");
    }

    pub fn line_width(&mut self, w: f64) {
        self.op(&format!("{w:.2} w"));
    }

    pub fn dash(&mut self, on: f64, off: f64) {
        self.op(&format!("[{on:.2} {off:.2}] 0 d"));
    }

    pub fn stroke_rgb(&mut self, r: f64, g: f64, b: f64) {
        self.op(&format!("{r:.3} {g:.3} {b:.3} RG"));
    }

    pub fn fill_rgb(&mut self, r: f64, g: f64, b: f64) {
        self.op(&format!("{r:.3} {g:.3} {b:.3} rg"));
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.op(&format!("{x1:.2} {y1:.2} m {x2:.2} {y2:.2} l S"));
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.op(&format!("{x:.2} {y:.2} {w:.2} {h:.2} re S"));
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.op(&format!("{x:.2} {y:.2} {w:.2} {h:.2} re f"));
    }

    /// Stroke an open path through `points`. Fewer than two points draw nothing.
    pub fn polyline(&mut self, points: &[(f64, f64)]) {
        let [(x0, y0), rest @ ..] = points else { return };
        if rest.is_empty() {
            return;
        }
        self.op(&format!("{x0:.2} {y0:.2} m"));
        for (x, y) in rest {
            self.op(&format!("{x:.2} {y:.2} l"));
        }
        self.op("S");
    }
}

/// Rendered width of `text` in Courier at `size`.
pub fn courier_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * COURIER_ADVANCE * size
}

/// Encode `text` as the body of a PDF literal string in WinAnsiEncoding.
///
/// Delimiters are escaped, bytes above 0x7E are written as octal escapes and
/// characters WinAnsi cannot represent become `?`.
pub fn encode_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = win_ansi_byte(ch).unwrap_or(b'?');
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            0x20..=0x7e => out.push(byte),
            _ => out.extend_from_slice(format!("\\{byte:03o}").as_bytes()),
        }
    }
    out
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7e => Some(code as u8),
        // WinAnsi agrees with Latin-1 above 0xA0.
        0xa0..=0xff => Some(code as u8),
        _ => match ch {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            '…' => Some(0x85),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '™' => Some(0x99),
            _ => None,
        },
    }
}
