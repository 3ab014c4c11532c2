//! # Drawing Surface
//!
//! The narrow contract between layout and an output format. Coordinates are
//! in points with the origin at the top-left corner of the page and y growing
//! downward; a backend that uses another convention (PDF) converts.
//!
//! [`RecordingSurface`] keeps every call as a [`DrawOp`] so tests can check
//! exactly what layout asked for.

use crate::font::{FontContext, StandardFont};
use crate::style::{BorderStyle, Color, Side, StyleData, TextDecoration};
use crate::text::Line;

/// Distance from the bottom of a line box to the baseline, as a fraction of
/// the font size.
const DESCENT: f64 = 0.2;

pub trait Surface {
    fn begin_page(&mut self, width: f64, height: f64);
    fn end_page(&mut self);

    fn save_state(&mut self);
    fn restore_state(&mut self);
    fn translate(&mut self, x: f64, y: f64);

    fn set_line_width(&mut self, width: f64);
    fn set_stroke_color(&mut self, color: Color);
    fn set_fill_color(&mut self, color: Color);
    fn set_dash(&mut self, dashed: bool);
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    /// A filled rectangle with its top-left corner at `(x, y)`.
    fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Open a text object with the first baseline at `(x, y)`.
    fn begin_text(&mut self, x: f64, y: f64);
    fn set_font(&mut self, font: StandardFont, size: f64);
    /// Move to the start of a new line, relative to the start of the current one.
    fn move_text(&mut self, dx: f64, dy: f64);
    fn show_text(&mut self, text: &str);
    fn end_text(&mut self);
}

/// A recorded [`Surface`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    BeginPage { width: f64, height: f64 },
    EndPage,
    SaveState,
    RestoreState,
    Translate { x: f64, y: f64 },
    LineWidth(f64),
    StrokeColor(Color),
    FillColor(Color),
    Dash(bool),
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    Rectangle { x: f64, y: f64, width: f64, height: f64 },
    BeginText { x: f64, y: f64 },
    SetFont { font: StandardFont, size: f64 },
    MoveText { dx: f64, dy: f64 },
    ShowText(String),
    EndText,
}

/// A text run as placed on the page: the absolute start of its line and
/// the string shown.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::BeginPage { .. }))
            .count()
    }

    /// Every `show_text` with the absolute position of its line start,
    /// following translations and text-line moves.
    pub fn placed_text(&self) -> Vec<PlacedText> {
        let mut placed = Vec::new();
        let mut page = 0;
        let mut offset = (0.0, 0.0);
        let mut saved = Vec::new();
        let mut origin = (0.0, 0.0);
        for op in &self.ops {
            match op {
                DrawOp::BeginPage { .. } => {
                    page += 1;
                    offset = (0.0, 0.0);
                    saved.clear();
                }
                DrawOp::SaveState => saved.push(offset),
                DrawOp::RestoreState => offset = saved.pop().unwrap_or((0.0, 0.0)),
                DrawOp::Translate { x, y } => offset = (offset.0 + x, offset.1 + y),
                DrawOp::BeginText { x, y } => origin = (offset.0 + x, offset.1 + y),
                DrawOp::MoveText { dx, dy } => origin = (origin.0 + dx, origin.1 + dy),
                DrawOp::ShowText(text) => placed.push(PlacedText {
                    page,
                    x: origin.0,
                    y: origin.1,
                    text: text.clone(),
                }),
                _ => {}
            }
        }
        placed
    }

    /// All shown text joined per page, words separated by single spaces.
    pub fn page_text(&self, page: usize) -> String {
        let mut text = String::new();
        let mut line = None;
        for run in self.placed_text().into_iter().filter(|run| run.page == page) {
            if line.is_some() && line != Some((run.x, run.y)) {
                text.push(' ');
            }
            line = Some((run.x, run.y));
            text.push_str(&run.text);
        }
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Filled rectangles recorded right after a fill color change to `color`.
    pub fn filled_with(&self, color: Color) -> Vec<(f64, f64, f64, f64)> {
        let mut fill = None;
        let mut rects = Vec::new();
        for op in &self.ops {
            match op {
                DrawOp::FillColor(c) => fill = Some(*c),
                DrawOp::Rectangle { x, y, width, height } if fill == Some(color) => {
                    rects.push((*x, *y, *width, *height))
                }
                _ => {}
            }
        }
        rects
    }
}

impl Surface for RecordingSurface {
    fn begin_page(&mut self, width: f64, height: f64) {
        self.ops.push(DrawOp::BeginPage { width, height });
    }

    fn end_page(&mut self) {
        self.ops.push(DrawOp::EndPage);
    }

    fn save_state(&mut self) {
        self.ops.push(DrawOp::SaveState);
    }

    fn restore_state(&mut self) {
        self.ops.push(DrawOp::RestoreState);
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::Translate { x, y });
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(DrawOp::LineWidth(width));
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.ops.push(DrawOp::StrokeColor(color));
    }

    fn set_fill_color(&mut self, color: Color) {
        self.ops.push(DrawOp::FillColor(color));
    }

    fn set_dash(&mut self, dashed: bool) {
        self.ops.push(DrawOp::Dash(dashed));
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.ops.push(DrawOp::Line { x1, y1, x2, y2 });
    }

    fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(DrawOp::Rectangle {
            x,
            y,
            width,
            height,
        });
    }

    fn begin_text(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::BeginText { x, y });
    }

    fn set_font(&mut self, font: StandardFont, size: f64) {
        self.ops.push(DrawOp::SetFont { font, size });
    }

    fn move_text(&mut self, dx: f64, dy: f64) {
        self.ops.push(DrawOp::MoveText { dx, dy });
    }

    fn show_text(&mut self, text: &str) {
        self.ops.push(DrawOp::ShowText(text.to_string()));
    }

    fn end_text(&mut self) {
        self.ops.push(DrawOp::EndText);
    }
}

/// Paint the background and the four border sides of a box whose border
/// box starts at `(x, y)`.
pub fn draw_border_and_background(
    surface: &mut dyn Surface,
    style: &StyleData,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) {
    let has_border = Side::ALL.iter().any(|side| style.border_width.get(*side) > 0.0);
    if style.background_color.is_none() && !has_border {
        return;
    }
    surface.save_state();
    surface.translate(x, y);
    if let Some(background) = style.background_color {
        draw_background(surface, background, 0.0, 0.0, width, height);
    }
    let (left, top, right, bottom) = (0.0, 0.0, width, height);
    for side in Side::ALL {
        let line_width = style.border_width.get(side);
        if line_width <= 0.0 {
            continue;
        }
        surface.set_line_width(line_width);
        surface.set_stroke_color(style.border_color.get(side));
        surface.set_dash(style.border_style.get(side) == BorderStyle::Dashed);
        match side {
            Side::Top => surface.line(left, top, right, top),
            Side::Right => surface.line(right, top, right, bottom),
            Side::Bottom => surface.line(left, bottom, right, bottom),
            Side::Left => surface.line(left, top, left, bottom),
        }
    }
    surface.restore_state();
}

/// Fill a rectangle without touching the border settings.
pub fn draw_background(surface: &mut dyn Surface, color: Color, x: f64, y: f64, width: f64, height: f64) {
    surface.set_fill_color(color);
    surface.rectangle(x, y, width, height);
}

/// A stroke under or through a run of text, drawn once the text object is closed.
#[derive(Debug, Clone, Copy)]
struct Stroke {
    x1: f64,
    x2: f64,
    y: f64,
    width: f64,
    color: Color,
}

/// Writes consecutive lines of one flow box into a single text object,
/// switching fonts and colors only when a styled part changes them.
pub struct TextCursor<'a> {
    fonts: &'a FontContext,
    line_start: Option<(f64, f64)>,
    font: Option<(StandardFont, u64)>,
    color: Option<Color>,
    strokes: Vec<Stroke>,
}

impl<'a> TextCursor<'a> {
    pub fn new(fonts: &'a FontContext) -> Self {
        TextCursor {
            fonts,
            line_start: None,
            font: None,
            color: None,
            strokes: Vec::new(),
        }
    }

    /// Show one line whose box starts at `(x, top)`.
    pub fn line(&mut self, surface: &mut dyn Surface, line: &Line, x: f64, top: f64) {
        let size = line
            .words
            .iter()
            .flat_map(|word| word.parts.iter())
            .map(|part| part.style.font_size)
            .fold(0.0, f64::max);
        let baseline = top + line.height - DESCENT * size;

        match self.line_start {
            None => surface.begin_text(x, baseline),
            Some((last_x, last_y)) => surface.move_text(x - last_x, baseline - last_y),
        }
        self.line_start = Some((x, baseline));

        let mut pen = x;
        for (index, word) in line.words.iter().enumerate() {
            for part in &word.parts {
                self.use_style(surface, &part.style);
                surface.show_text(&part.text);
                let advance = self.fonts.measure(&part.text, &part.style);
                self.decorate(&part.style, pen, pen + advance, baseline);
                pen += advance;
            }
            if index + 1 < line.words.len() {
                surface.show_text(" ");
                pen += word.space_width(self.fonts);
            }
        }
    }

    fn use_style(&mut self, surface: &mut dyn Surface, style: &StyleData) {
        let font = StandardFont::for_style(style);
        let key = (font, style.font_size.to_bits());
        if self.font != Some(key) {
            surface.set_font(font, style.font_size);
            self.font = Some(key);
        }
        if self.color != Some(style.color) {
            surface.set_fill_color(style.color);
            self.color = Some(style.color);
        }
    }

    fn decorate(&mut self, style: &StyleData, x1: f64, x2: f64, baseline: f64) {
        let y = match style.text_decoration {
            TextDecoration::None => return,
            TextDecoration::Underline => baseline + style.font_size * 0.1,
            TextDecoration::LineThrough => baseline - style.font_size * 0.3,
        };
        self.strokes.push(Stroke {
            x1,
            x2,
            y,
            width: (style.font_size / 18.0).max(0.5),
            color: style.color,
        });
    }

    /// Close the text object, if one is open, and draw pending decorations.
    pub fn finish(&mut self, surface: &mut dyn Surface) {
        if self.line_start.take().is_some() {
            surface.end_text();
        }
        self.font = None;
        self.color = None;
        for stroke in self.strokes.drain(..) {
            surface.set_line_width(stroke.width);
            surface.set_stroke_color(stroke.color);
            surface.set_dash(false);
            surface.line(stroke.x1, stroke.y, stroke.x2, stroke.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Declaration, StyleCache};
    use crate::text::Word;

    #[test]
    fn nothing_to_paint_records_nothing() {
        let cache = StyleCache::new();
        let mut surface = RecordingSurface::new();
        draw_border_and_background(&mut surface, &cache.default_style(), 0.0, 0.0, 10.0, 10.0);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn background_then_borders() {
        let cache = StyleCache::new();
        let red = Color::rgb(1.0, 0.0, 0.0);
        let style = cache.default_style().set(
            &cache,
            &[
                Declaration::BackgroundColor(Some(red)),
                Declaration::BorderWidth(Side::Bottom, 1.0),
            ],
        );
        let mut surface = RecordingSurface::new();
        draw_border_and_background(&mut surface, &style, 5.0, 7.0, 100.0, 20.0);
        assert_eq!(surface.filled_with(red), vec![(0.0, 0.0, 100.0, 20.0)]);
        assert!(surface.ops.contains(&DrawOp::Line {
            x1: 0.0,
            y1: 20.0,
            x2: 100.0,
            y2: 20.0
        }));
        assert_eq!(surface.ops.first(), Some(&DrawOp::SaveState));
        assert_eq!(surface.ops.last(), Some(&DrawOp::RestoreState));
    }

    #[test]
    fn lines_share_one_text_object() {
        let cache = StyleCache::new();
        let fonts = FontContext::new();
        let style = cache.default_style();
        let mut first = Line::default();
        first.push(Word::new(&style, "one"), &fonts);
        first.push(Word::new(&style, "two"), &fonts);
        let mut second = Line::default();
        second.push(Word::new(&style, "three"), &fonts);

        let mut surface = RecordingSurface::new();
        let mut cursor = TextCursor::new(&fonts);
        cursor.line(&mut surface, &first, 10.0, 0.0);
        cursor.line(&mut surface, &second, 10.0, 14.0);
        cursor.finish(&mut surface);

        let begins = surface
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::BeginText { .. }))
            .count();
        let fonts_set = surface
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::SetFont { .. }))
            .count();
        assert_eq!(begins, 1);
        assert_eq!(fonts_set, 1);
        let placed = surface.placed_text();
        assert_eq!(placed.last().map(|p| p.y), Some(14.0 + 14.0 - 0.2 * 12.0));
        assert_eq!(surface.page_text(0), "one two three");
    }

    #[test]
    fn underline_is_stroked_after_text() {
        let cache = StyleCache::new();
        let fonts = FontContext::new();
        let style = cache
            .default_style()
            .set(&cache, &[Declaration::TextDecoration(TextDecoration::Underline)]);
        let mut line = Line::default();
        line.push(Word::new(&style, "under"), &fonts);

        let mut surface = RecordingSurface::new();
        let mut cursor = TextCursor::new(&fonts);
        cursor.line(&mut surface, &line, 0.0, 0.0);
        cursor.finish(&mut surface);

        let end = surface.ops.iter().position(|op| *op == DrawOp::EndText);
        let stroke = surface.ops.iter().position(|op| matches!(op, DrawOp::Line { .. }));
        assert!(end < stroke);
    }
}
