//! # PDF Serializer
//!
//! A [`Surface`] that records PDF content-stream operators page by page and
//! writes a complete PDF 1.7 file on [`PdfWriter::finish`].
//!
//! Layout works top-down from the top-left corner; PDF user space starts at
//! the bottom-left. Every operator flips its y coordinate against the page
//! height, and translations are negated in y, so the two compose the same
//! way they do in layout space.
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, pages, content streams
//! ...
//! xref                <- byte offsets of each object
//! trailer             <- points to the root object
//! %%EOF
//! ```

use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::draw::Surface;
use crate::font::StandardFont;
use crate::style::Color;

/// One finished or in-progress page.
#[derive(Debug, Default)]
struct PdfPage {
    width: f64,
    height: f64,
    content: String,
}

#[derive(Debug, Default)]
pub struct PdfWriter {
    pages: Vec<PdfPage>,
    current: Option<PdfPage>,
    /// Faces in first-use order; a face's index is its `/F` resource number.
    fonts: Vec<StandardFont>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.current.is_some())
    }

    /// The uncompressed content stream of a finished page.
    pub fn page_content(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(|page| page.content.as_str())
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        if let Some(page) = self.current.as_mut() {
            let _ = page.content.write_fmt(args);
        }
    }

    fn page_height(&self) -> f64 {
        self.current.as_ref().map_or(0.0, |page| page.height)
    }

    fn font_index(&mut self, font: StandardFont) -> usize {
        match self.fonts.iter().position(|f| *f == font) {
            Some(index) => index,
            None => {
                self.fonts.push(font);
                self.fonts.len() - 1
            }
        }
    }

    /// Close any open page and serialize the document.
    pub fn finish(mut self) -> Vec<u8> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }

        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        let mut objects: Vec<PdfObject> = (0..3).map(|_| PdfObject { data: Vec::new() }).collect();

        let mut font_ids = Vec::with_capacity(self.fonts.len());
        for font in &self.fonts {
            font_ids.push(objects.len());
            objects.push(PdfObject {
                data: format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.pdf_name()
                )
                .into_bytes(),
            });
        }
        let font_resources = font_ids
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_ids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let compressed = compress_to_vec_zlib(page.content.as_bytes(), 6);
            let content_id = objects.len();
            let mut content = Vec::new();
            let _ = write!(
                content,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content.extend_from_slice(&compressed);
            content.extend_from_slice(b"\nendstream");
            objects.push(PdfObject { data: content });

            page_ids.push(objects.len());
            objects.push(PdfObject {
                data: format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Contents {} 0 R /Resources << /Font << {} >> >> >>",
                    page.width, page.height, content_id, font_resources
                )
                .into_bytes(),
            });
        }

        objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        objects[2].data = format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()).into_bytes();

        let info_id = objects.len();
        objects.push(PdfObject {
            data: format!("<< /Producer (Quire {}) >>", env!("CARGO_PKG_VERSION")).into_bytes(),
        });

        serialize(&objects, info_id)
    }
}

/// Escape special characters in a PDF string. Characters outside Latin-1
/// have no WinAnsi code and become `?`.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(objects: &[PdfObject], info_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, object) in objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(&object.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len(),
        info_id,
        xref_offset
    );
    output
}

impl Surface for PdfWriter {
    fn begin_page(&mut self, width: f64, height: f64) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.current = Some(PdfPage {
            width,
            height,
            content: String::new(),
        });
    }

    fn end_page(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
    }

    fn save_state(&mut self) {
        self.emit(format_args!("q\n"));
    }

    fn restore_state(&mut self) {
        self.emit(format_args!("Q\n"));
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.emit(format_args!("1 0 0 1 {:.2} {:.2} cm\n", x, -y));
    }

    fn set_line_width(&mut self, width: f64) {
        self.emit(format_args!("{:.2} w\n", width));
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.emit(format_args!("{:.3} {:.3} {:.3} RG\n", color.r, color.g, color.b));
    }

    fn set_fill_color(&mut self, color: Color) {
        self.emit(format_args!("{:.3} {:.3} {:.3} rg\n", color.r, color.g, color.b));
    }

    fn set_dash(&mut self, dashed: bool) {
        if dashed {
            self.emit(format_args!("[3 2] 0 d\n"));
        } else {
            self.emit(format_args!("[] 0 d\n"));
        }
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let h = self.page_height();
        self.emit(format_args!(
            "{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
            x1,
            h - y1,
            x2,
            h - y2
        ));
    }

    fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let h = self.page_height();
        self.emit(format_args!(
            "{:.2} {:.2} {:.2} {:.2} re\nf\n",
            x,
            h - y - height,
            width,
            height
        ));
    }

    fn begin_text(&mut self, x: f64, y: f64) {
        let h = self.page_height();
        self.emit(format_args!("BT\n1 0 0 1 {:.2} {:.2} Tm\n", x, h - y));
    }

    fn set_font(&mut self, font: StandardFont, size: f64) {
        let index = self.font_index(font);
        self.emit(format_args!("/F{} {:.1} Tf\n", index, size));
    }

    fn move_text(&mut self, dx: f64, dy: f64) {
        self.emit(format_args!("{:.2} {:.2} Td\n", dx, -dy));
    }

    fn show_text(&mut self, text: &str) {
        let escaped = escape_pdf_string(text);
        self.emit(format_args!("({}) Tj\n", escaped));
    }

    fn end_text(&mut self) {
        self.emit(format_args!("ET\n"));
    }
}
