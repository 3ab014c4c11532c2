//! # Style System
//!
//! An immutable, structurally-shared style record. A [`Style`] is a handle to
//! an interned [`StyleData`]: two styles with identical property values are
//! the same allocation, so "did this property change" is a pointer compare.
//!
//! Styles are never mutated in place. Every change goes through
//! [`Style::set`], which copies the record, applies typed [`Declaration`]s
//! and interns the result in the session's [`StyleCache`].
//!
//! This is intentionally a subset of CSS: the properties needed for
//! paginated document layout (typography, box model, borders, table
//! spacing and page-break hints).

mod cache;

pub use cache::StyleCache;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

// ── Keyword enums ──────────────────────────────────────────────

/// The computed `display` value. Selects a box's layout behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Display {
    Block,
    Inline,
    ListItem,
    Table,
    TableCaption,
    TableColumnGroup,
    TableColumn,
    TableHeaderGroup,
    TableRowGroup,
    TableFooterGroup,
    TableRow,
    TableCell,
    None,
}

impl Display {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "block" => Display::Block,
            "inline" => Display::Inline,
            "list-item" => Display::ListItem,
            "table" => Display::Table,
            "table-caption" => Display::TableCaption,
            "table-column-group" => Display::TableColumnGroup,
            "table-column" => Display::TableColumn,
            "table-header-group" => Display::TableHeaderGroup,
            "table-row-group" => Display::TableRowGroup,
            "table-footer-group" => Display::TableFooterGroup,
            "table-row" => Display::TableRow,
            "table-cell" => Display::TableCell,
            "none" => Display::None,
            _ => return None,
        })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Display::Block => "block",
            Display::Inline => "inline",
            Display::ListItem => "list-item",
            Display::Table => "table",
            Display::TableCaption => "table-caption",
            Display::TableColumnGroup => "table-column-group",
            Display::TableColumn => "table-column",
            Display::TableHeaderGroup => "table-header-group",
            Display::TableRowGroup => "table-row-group",
            Display::TableFooterGroup => "table-footer-group",
            Display::TableRow => "table-row",
            Display::TableCell => "table-cell",
            Display::None => "none",
        }
    }

    /// Any of the three row-group displays.
    pub fn is_row_group(&self) -> bool {
        matches!(
            self,
            Display::TableHeaderGroup | Display::TableRowGroup | Display::TableFooterGroup
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Map a CSS family name (or generic family) onto a standard font family.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" | "arial" | "sans-serif" => Some(FontFamily::Helvetica),
            "times" | "times new roman" | "times-roman" | "serif" => Some(FontFamily::Times),
            "courier" | "courier new" | "monospace" => Some(FontFamily::Courier),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderCollapse {
    Collapse,
    #[default]
    Separate,
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_rgba8(channels: [u8; 4]) -> Self {
        Self {
            r: channels[0] as f64 / 255.0,
            g: channels[1] as f64 / 255.0,
            b: channels[2] as f64 / 255.0,
            a: channels[3] as f64 / 255.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Hash a float consistently with `==`: `-0.0` and `0.0` hash alike.
fn hash_f64<H: Hasher>(v: f64, state: &mut H) {
    (v + 0.0).to_bits().hash(state);
}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for channel in [self.r, self.g, self.b, self.a] {
            hash_f64(channel, state);
        }
    }
}

/// Edge values (top, right, bottom, left) used for margin, padding and border widths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    pub fn get(&self, side: Side) -> f64 {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }

    fn set(&mut self, side: Side, v: f64) {
        match side {
            Side::Top => self.top = v,
            Side::Right => self.right = v,
            Side::Bottom => self.bottom = v,
            Side::Left => self.left = v,
        }
    }
}

impl Hash for Edges {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in [self.top, self.right, self.bottom, self.left] {
            hash_f64(v, state);
        }
    }
}

/// Per-side values of any copyable type (border colors and styles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeValues<T: Copy> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Copy> EdgeValues<T> {
    pub fn uniform(v: T) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn get(&self, side: Side) -> T {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }

    fn set(&mut self, side: Side, v: T) {
        match side {
            Side::Top => self.top = v,
            Side::Right => self.right = v,
            Side::Bottom => self.bottom = v,
            Side::Left => self.left = v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    fn index(self) -> u32 {
        match self {
            Side::Top => 0,
            Side::Right => 1,
            Side::Bottom => 2,
            Side::Left => 3,
        }
    }
}

/// One piece of generated page content (`content: "Page " counter(page)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentPart {
    Text(String),
    PageNumber,
}

/// Render generated content for a given page number.
pub fn render_content(parts: &[ContentPart], page_number: u32) -> String {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => text.clone(),
            ContentPart::PageNumber => page_number.to_string(),
        })
        .collect()
}

// ── Properties and declarations ────────────────────────────────

/// A single addressable style property. Used to track which properties
/// were explicitly set on a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Display,
    Visibility,
    FontFamily,
    FontSize,
    FontWeight,
    FontStyle,
    TextDecoration,
    Color,
    TextAlign,
    VerticalAlign,
    Padding(Side),
    Margin(Side),
    BorderWidth(Side),
    BorderColor(Side),
    BorderStyle(Side),
    BackgroundColor,
    PageBreakBefore,
    PageBreakAfter,
    PageBreakInside,
    BorderCollapse,
    BorderSpacingHorizontal,
    BorderSpacingVertical,
    PageBottomRightContent,
}

impl Property {
    /// Properties a child takes from its parent when they were set there.
    pub const INHERITED: [Property; 11] = [
        Property::Visibility,
        Property::FontFamily,
        Property::FontSize,
        Property::FontWeight,
        Property::FontStyle,
        Property::TextDecoration,
        Property::Color,
        Property::TextAlign,
        Property::BorderCollapse,
        Property::BorderSpacingHorizontal,
        Property::BorderSpacingVertical,
    ];

    pub fn is_inherited(&self) -> bool {
        Self::INHERITED.contains(self)
    }

    fn bit(&self) -> u64 {
        let index = match self {
            Property::Display => 0,
            Property::Visibility => 1,
            Property::FontFamily => 2,
            Property::FontSize => 3,
            Property::FontWeight => 4,
            Property::FontStyle => 5,
            Property::TextDecoration => 6,
            Property::Color => 7,
            Property::TextAlign => 8,
            Property::VerticalAlign => 9,
            Property::Padding(side) => 10 + side.index(),
            Property::Margin(side) => 14 + side.index(),
            Property::BorderWidth(side) => 18 + side.index(),
            Property::BorderColor(side) => 22 + side.index(),
            Property::BorderStyle(side) => 26 + side.index(),
            Property::BackgroundColor => 30,
            Property::PageBreakBefore => 31,
            Property::PageBreakAfter => 32,
            Property::PageBreakInside => 33,
            Property::BorderCollapse => 34,
            Property::BorderSpacingHorizontal => 35,
            Property::BorderSpacingVertical => 36,
            Property::PageBottomRightContent => 37,
        };
        1 << index
    }
}

/// A typed property assignment, already unit-normalized to points.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Display(Display),
    Visibility(bool),
    FontFamily(FontFamily),
    FontSize(f64),
    FontWeight(FontWeight),
    FontStyle(FontStyle),
    TextDecoration(TextDecoration),
    Color(Color),
    TextAlign(TextAlign),
    VerticalAlign(VerticalAlign),
    Padding(Side, f64),
    Margin(Side, f64),
    BorderWidth(Side, f64),
    BorderColor(Side, Color),
    BorderStyle(Side, BorderStyle),
    BackgroundColor(Option<Color>),
    PageBreakBefore(bool),
    PageBreakAfter(bool),
    PageBreakInside(bool),
    BorderCollapse(BorderCollapse),
    BorderSpacingHorizontal(f64),
    BorderSpacingVertical(f64),
    PageBottomRightContent(Vec<ContentPart>),
}

impl Declaration {
    pub fn property(&self) -> Property {
        match self {
            Declaration::Display(_) => Property::Display,
            Declaration::Visibility(_) => Property::Visibility,
            Declaration::FontFamily(_) => Property::FontFamily,
            Declaration::FontSize(_) => Property::FontSize,
            Declaration::FontWeight(_) => Property::FontWeight,
            Declaration::FontStyle(_) => Property::FontStyle,
            Declaration::TextDecoration(_) => Property::TextDecoration,
            Declaration::Color(_) => Property::Color,
            Declaration::TextAlign(_) => Property::TextAlign,
            Declaration::VerticalAlign(_) => Property::VerticalAlign,
            Declaration::Padding(side, _) => Property::Padding(*side),
            Declaration::Margin(side, _) => Property::Margin(*side),
            Declaration::BorderWidth(side, _) => Property::BorderWidth(*side),
            Declaration::BorderColor(side, _) => Property::BorderColor(*side),
            Declaration::BorderStyle(side, _) => Property::BorderStyle(*side),
            Declaration::BackgroundColor(_) => Property::BackgroundColor,
            Declaration::PageBreakBefore(_) => Property::PageBreakBefore,
            Declaration::PageBreakAfter(_) => Property::PageBreakAfter,
            Declaration::PageBreakInside(_) => Property::PageBreakInside,
            Declaration::BorderCollapse(_) => Property::BorderCollapse,
            Declaration::BorderSpacingHorizontal(_) => Property::BorderSpacingHorizontal,
            Declaration::BorderSpacingVertical(_) => Property::BorderSpacingVertical,
            Declaration::PageBottomRightContent(_) => Property::PageBottomRightContent,
        }
    }
}

// ── The style record ───────────────────────────────────────────

/// The complete set of style properties for a box. All values are concrete;
/// `set_properties` records which of them were explicitly assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleData {
    set_properties: u64,

    pub display: Display,
    pub visibility: bool,

    pub font_family: FontFamily,
    pub font_size: f64,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub text_decoration: TextDecoration,
    pub color: Color,

    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,

    pub padding: Edges,
    pub margin: Edges,
    pub border_width: Edges,
    pub border_color: EdgeValues<Color>,
    pub border_style: EdgeValues<BorderStyle>,

    pub background_color: Option<Color>,

    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside: bool,

    pub border_collapse: BorderCollapse,
    pub border_spacing_horizontal: f64,
    pub border_spacing_vertical: f64,

    pub page_bottom_right_content: Vec<ContentPart>,
}

// Lengths never hold NaN: they come from parsed CSS numbers.
impl Eq for StyleData {}

impl Hash for StyleData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.set_properties.hash(state);
        self.display.hash(state);
        self.visibility.hash(state);
        self.font_family.hash(state);
        hash_f64(self.font_size, state);
        self.font_weight.hash(state);
        self.font_style.hash(state);
        self.text_decoration.hash(state);
        self.color.hash(state);
        self.text_align.hash(state);
        self.vertical_align.hash(state);
        self.padding.hash(state);
        self.margin.hash(state);
        self.border_width.hash(state);
        self.border_color.hash(state);
        self.border_style.hash(state);
        self.background_color.hash(state);
        self.page_break_before.hash(state);
        self.page_break_after.hash(state);
        self.page_break_inside.hash(state);
        self.border_collapse.hash(state);
        hash_f64(self.border_spacing_horizontal, state);
        hash_f64(self.border_spacing_vertical, state);
        self.page_bottom_right_content.hash(state);
    }
}

impl Default for StyleData {
    fn default() -> Self {
        StyleData {
            set_properties: 0,
            display: Display::Inline,
            visibility: true,
            font_family: FontFamily::Helvetica,
            font_size: 12.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            text_decoration: TextDecoration::None,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            vertical_align: VerticalAlign::Top,
            padding: Edges::default(),
            margin: Edges::default(),
            border_width: Edges::default(),
            border_color: EdgeValues::uniform(Color::BLACK),
            border_style: EdgeValues::uniform(BorderStyle::Solid),
            background_color: None,
            page_break_before: false,
            page_break_after: false,
            page_break_inside: true,
            border_collapse: BorderCollapse::Separate,
            border_spacing_horizontal: 2.0,
            border_spacing_vertical: 2.0,
            page_bottom_right_content: Vec::new(),
        }
    }
}

impl StyleData {
    fn apply(&mut self, declaration: &Declaration) {
        self.set_properties |= declaration.property().bit();
        match declaration {
            Declaration::Display(v) => self.display = *v,
            Declaration::Visibility(v) => self.visibility = *v,
            Declaration::FontFamily(v) => self.font_family = *v,
            Declaration::FontSize(v) => self.font_size = *v,
            Declaration::FontWeight(v) => self.font_weight = *v,
            Declaration::FontStyle(v) => self.font_style = *v,
            Declaration::TextDecoration(v) => self.text_decoration = *v,
            Declaration::Color(v) => self.color = *v,
            Declaration::TextAlign(v) => self.text_align = *v,
            Declaration::VerticalAlign(v) => self.vertical_align = *v,
            Declaration::Padding(side, v) => self.padding.set(*side, *v),
            Declaration::Margin(side, v) => self.margin.set(*side, *v),
            Declaration::BorderWidth(side, v) => self.border_width.set(*side, *v),
            Declaration::BorderColor(side, v) => self.border_color.set(*side, *v),
            Declaration::BorderStyle(side, v) => self.border_style.set(*side, *v),
            Declaration::BackgroundColor(v) => self.background_color = *v,
            Declaration::PageBreakBefore(v) => self.page_break_before = *v,
            Declaration::PageBreakAfter(v) => self.page_break_after = *v,
            Declaration::PageBreakInside(v) => self.page_break_inside = *v,
            Declaration::BorderCollapse(v) => self.border_collapse = *v,
            Declaration::BorderSpacingHorizontal(v) => self.border_spacing_horizontal = *v,
            Declaration::BorderSpacingVertical(v) => self.border_spacing_vertical = *v,
            Declaration::PageBottomRightContent(v) => self.page_bottom_right_content = v.clone(),
        }
    }

    /// The current value of `property` expressed as a declaration.
    fn declaration(&self, property: Property) -> Declaration {
        match property {
            Property::Display => Declaration::Display(self.display),
            Property::Visibility => Declaration::Visibility(self.visibility),
            Property::FontFamily => Declaration::FontFamily(self.font_family),
            Property::FontSize => Declaration::FontSize(self.font_size),
            Property::FontWeight => Declaration::FontWeight(self.font_weight),
            Property::FontStyle => Declaration::FontStyle(self.font_style),
            Property::TextDecoration => Declaration::TextDecoration(self.text_decoration),
            Property::Color => Declaration::Color(self.color),
            Property::TextAlign => Declaration::TextAlign(self.text_align),
            Property::VerticalAlign => Declaration::VerticalAlign(self.vertical_align),
            Property::Padding(side) => Declaration::Padding(side, self.padding.get(side)),
            Property::Margin(side) => Declaration::Margin(side, self.margin.get(side)),
            Property::BorderWidth(side) => {
                Declaration::BorderWidth(side, self.border_width.get(side))
            }
            Property::BorderColor(side) => {
                Declaration::BorderColor(side, self.border_color.get(side))
            }
            Property::BorderStyle(side) => {
                Declaration::BorderStyle(side, self.border_style.get(side))
            }
            Property::BackgroundColor => Declaration::BackgroundColor(self.background_color),
            Property::PageBreakBefore => Declaration::PageBreakBefore(self.page_break_before),
            Property::PageBreakAfter => Declaration::PageBreakAfter(self.page_break_after),
            Property::PageBreakInside => Declaration::PageBreakInside(self.page_break_inside),
            Property::BorderCollapse => Declaration::BorderCollapse(self.border_collapse),
            Property::BorderSpacingHorizontal => {
                Declaration::BorderSpacingHorizontal(self.border_spacing_horizontal)
            }
            Property::BorderSpacingVertical => {
                Declaration::BorderSpacingVertical(self.border_spacing_vertical)
            }
            Property::PageBottomRightContent => {
                Declaration::PageBottomRightContent(self.page_bottom_right_content.clone())
            }
        }
    }

    /// Whether `property` was explicitly assigned rather than defaulted.
    pub fn is_set(&self, property: Property) -> bool {
        self.set_properties & property.bit() != 0
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    /// Vertical advance of one line of text in this style.
    pub fn leading(&self) -> f64 {
        (self.font_size * 1.2).floor()
    }
}

// ── The interned handle ────────────────────────────────────────

/// A shared, interned style. Equality is identity.
#[derive(Clone)]
pub struct Style(Rc<StyleData>);

impl Style {
    pub(crate) fn from_interned(data: Rc<StyleData>) -> Self {
        Style(data)
    }

    /// Copy-on-write assignment: apply `declarations` in order and return the
    /// interned result. Equal inputs yield the same `Style`.
    pub fn set(&self, cache: &StyleCache, declarations: &[Declaration]) -> Style {
        if declarations.is_empty() {
            return self.clone();
        }
        let mut data = (*self.0).clone();
        for declaration in declarations {
            data.apply(declaration);
        }
        cache.intern(data)
    }

    /// The initial style of a child box: the default record plus every
    /// inheritable property this style has explicitly set.
    pub fn inherit(&self, cache: &StyleCache) -> Style {
        let inherited = self.inheritable_declarations(|_| true);
        cache.default_style().set(cache, &inherited)
    }

    /// Fill in inheritable properties set on `parent` that this style has
    /// not set itself. Descendant overrides are never clobbered.
    pub fn inherit_from(&self, cache: &StyleCache, parent: &Style) -> Style {
        let inherited = parent.inheritable_declarations(|property| !self.is_set(property));
        self.set(cache, &inherited)
    }

    fn inheritable_declarations(&self, keep: impl Fn(Property) -> bool) -> Vec<Declaration> {
        Property::INHERITED
            .iter()
            .copied()
            .filter(|property| self.is_set(*property) && keep(*property))
            .map(|property| self.declaration(property))
            .collect()
    }

    pub fn ptr_eq(a: &Style, b: &Style) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for Style {
    type Target = StyleData;

    fn deref(&self) -> &StyleData {
        &self.0
    }
}

impl PartialEq for Style {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Style {}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
