//! Minimal PDF 1.4 writer.
//!
//! Only what the calibration report needs: indirect objects, uncompressed
//! content streams, the three standard Type1 fonts, a classic `xref` table and
//! trailer. Output is a pure function of the objects added, so identical
//! content yields identical bytes.
//!
//! Objects are serialized in id order. `reserve` hands out an id before its
//! body is known, which is how forward references (pages -> parent, page ->
//! footer) are resolved.

pub mod content;

pub use content::*;

use std::fmt;

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0 R", self.0)
    }
}

/// The 14 standard fonts need no embedding; we use three of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    Courier,
}

impl StandardFont {
    pub const ALL: [StandardFont; 3] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::Courier,
    ];

    /// Resource name used inside content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "F1",
            StandardFont::HelveticaBold => "F2",
            StandardFont::Courier => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::Courier => "Courier",
        }
    }
}

/// Errors raised while assembling a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfError {
    /// An id was reserved but never given a body.
    UnfilledObject(u32),
    UnknownObject(u32),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::UnfilledObject(n) => write!(f, "object {n} was reserved but never written"),
            PdfError::UnknownObject(n) => write!(f, "object {n} does not exist"),
        }
    }
}

impl std::error::Error for PdfError {}

/// An in-memory PDF under construction.
#[derive(Debug, Default)]
pub struct PdfDocument {
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id whose body will be supplied later with [`PdfDocument::set`].
    pub fn reserve(&mut self) -> ObjectId {
        self.objects.push(None);
        ObjectId(self.objects.len() as u32)
    }

    pub fn set(&mut self, id: ObjectId, body: impl Into<Vec<u8>>) -> Result<(), PdfError> {
        let slot = self
            .objects
            .get_mut(id.0 as usize - 1)
            .ok_or(PdfError::UnknownObject(id.0))?;
        *slot = Some(body.into());
        Ok(())
    }

    pub fn add(&mut self, body: impl Into<Vec<u8>>) -> ObjectId {
        self.objects.push(Some(body.into()));
        ObjectId(self.objects.len() as u32)
    }

    /// Wrap raw stream data with its length dictionary.
    pub fn stream_body(data: &[u8]) -> Vec<u8> {
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        body
    }

    pub fn add_stream(&mut self, data: &[u8]) -> ObjectId {
        self.add(Self::stream_body(data))
    }

    /// Font dictionary body for a standard font.
    pub fn font_body(font: StandardFont) -> String {
        format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
            font.base_font()
        )
    }

    /// Serialize the document with `root` as the catalog.
    pub fn finish(self, root: ObjectId, info: Option<ObjectId>) -> Result<Vec<u8>, PdfError> {
        let mut out = Vec::new();
        // The comment line with high-bit bytes marks the file as binary.
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(self.objects.len());
        for (idx, body) in self.objects.into_iter().enumerate() {
            let number = idx as u32 + 1;
            let body = body.ok_or(PdfError::UnfilledObject(number))?;
            offsets.push(out.len());
            out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
            out.extend_from_slice(&body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let size = offsets.len() + 1;
        out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }

        let info = info.map(|id| format!(" /Info {id}")).unwrap_or_default();
        out.extend_from_slice(
            format!("trailer\n<< /Size {size} /Root {root}{info} >>\nstartxref\n{xref_offset}\n%%EOF\n")
                .as_bytes(),
        );
        Ok(out)
    }
}
