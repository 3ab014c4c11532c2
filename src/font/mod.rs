//! # Font Management
//!
//! Text measurement with the standard PDF Type1 fonts. These need no
//! embedding, so a font is fully described by its [`StandardFont`] name and
//! a static width table.

pub mod metrics;

use std::cell::RefCell;
use std::collections::HashMap;

pub use metrics::StandardFontMetrics;

use crate::style::{FontFamily, StyleData};

/// The twelve text faces of the standard PDF fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    pub const ALL: [StandardFont; 12] = [
        Self::Helvetica,
        Self::HelveticaBold,
        Self::HelveticaOblique,
        Self::HelveticaBoldOblique,
        Self::TimesRoman,
        Self::TimesBold,
        Self::TimesItalic,
        Self::TimesBoldItalic,
        Self::Courier,
        Self::CourierBold,
        Self::CourierOblique,
        Self::CourierBoldOblique,
    ];

    /// The face for a family, weight and slant.
    pub fn select(family: FontFamily, bold: bool, italic: bool) -> Self {
        match (family, bold, italic) {
            (FontFamily::Helvetica, false, false) => Self::Helvetica,
            (FontFamily::Helvetica, true, false) => Self::HelveticaBold,
            (FontFamily::Helvetica, false, true) => Self::HelveticaOblique,
            (FontFamily::Helvetica, true, true) => Self::HelveticaBoldOblique,
            (FontFamily::Times, false, false) => Self::TimesRoman,
            (FontFamily::Times, true, false) => Self::TimesBold,
            (FontFamily::Times, false, true) => Self::TimesItalic,
            (FontFamily::Times, true, true) => Self::TimesBoldItalic,
            (FontFamily::Courier, false, false) => Self::Courier,
            (FontFamily::Courier, true, false) => Self::CourierBold,
            (FontFamily::Courier, false, true) => Self::CourierOblique,
            (FontFamily::Courier, true, true) => Self::CourierBoldOblique,
        }
    }

    /// The face a style's text is set in.
    pub fn for_style(style: &StyleData) -> Self {
        Self::select(style.font_family, style.is_bold(), style.is_italic())
    }

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &metrics::HELVETICA_BOLD,
            Self::TimesRoman | Self::TimesItalic => &metrics::TIMES_ROMAN,
            Self::TimesBold | Self::TimesBoldItalic => &metrics::TIMES_BOLD,
            _ => &metrics::COURIER,
        }
    }
}

/// Shared font context used by layout and drawing.
///
/// Holds the space-width memo table: one entry per (font, size) pair, never
/// evicted.
#[derive(Debug, Default)]
pub struct FontContext {
    space_widths: RefCell<HashMap<(StandardFont, u64), f64>>,
}

impl FontContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Width of `text` set in `style`, in points.
    pub fn measure(&self, text: &str, style: &StyleData) -> f64 {
        StandardFont::for_style(style)
            .metrics()
            .measure_string(text, style.font_size)
    }

    /// Width of one space in `style`, memoized per font and size.
    pub fn space_width(&self, style: &StyleData) -> f64 {
        let font = StandardFont::for_style(style);
        let key = (font, style.font_size.to_bits());
        *self
            .space_widths
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| font.metrics().char_width(' ', style.font_size))
    }

    /// Number of memoized space widths.
    pub fn cached_space_widths(&self) -> usize {
        self.space_widths.borrow().len()
    }
}
