//! # The Page Loop
//!
//! Takes the top-level boxes of the document one at a time: measure at the
//! page's content width, draw if it fits, otherwise split and carry the rest
//! over to a fresh page. A box that does not fit even on an empty page is
//! drawn anyway (and overflows) so the loop always makes progress.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::LayoutContext;
use crate::css::selector::{Element, PAGE_TAG};
use crate::css::Stylesheet;
use crate::draw::{Surface, TextCursor};
use crate::error::{QuireError, Result};
use crate::font::FontContext;
use crate::style::{render_content, Edges, Property, Side, Style, StyleCache};
use crate::text::{Line, Word};
use crate::tree::{Behavior, BoxTree, Child, Node, NodeId};

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Size and margins of every page. `@page` rules may override the margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default)]
    pub size: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_margin(),
        }
    }
}

fn default_margin() -> Edges {
    Edges::uniform(72.0)
}

fn default_true() -> bool {
    true
}

/// Everything a caller can configure about a render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    #[serde(default)]
    pub page: PageConfig,

    /// Apply the built-in user agent stylesheet before author CSS.
    #[serde(default = "default_true")]
    pub user_agent_stylesheet: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page: PageConfig::default(),
            user_agent_stylesheet: true,
        }
    }
}

impl RenderOptions {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The node `@page` rules are matched against. Its position is the page
/// number, so `@page :first` applies to page one only.
#[derive(Debug, Clone, Copy)]
struct PageElement {
    number: u32,
}

impl Element for PageElement {
    fn tag(&self) -> &str {
        PAGE_TAG
    }

    fn id(&self) -> Option<&str> {
        None
    }

    fn has_class(&self, _name: &str) -> bool {
        false
    }

    fn has_attribute(&self, _name: &str) -> bool {
        false
    }

    fn position(&self) -> usize {
        self.number as usize
    }

    fn position_of_type(&self) -> usize {
        self.number as usize
    }

    fn is_last(&self) -> bool {
        false
    }

    fn parent(&self) -> Option<Self> {
        None
    }

    fn previous_sibling(&self) -> Option<Self> {
        None
    }
}

/// One page being filled.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub width: f64,
    pub height: f64,
    pub margin: Edges,
    /// The computed `@page` style for this page.
    pub style: Style,
    /// Vertical space left below what has been placed so far.
    pub available_height: f64,
}

impl Page {
    fn new(number: u32, config: &PageConfig, sheet: &Stylesheet, cache: &StyleCache) -> Self {
        let (width, height) = config.size.dimensions();
        let style = sheet.apply(PageElement { number }, &cache.default_style(), cache);
        let mut margin = config.margin;
        for side in Side::ALL {
            if style.is_set(Property::Margin(side)) {
                match side {
                    Side::Top => margin.top = style.margin.top,
                    Side::Right => margin.right = style.margin.right,
                    Side::Bottom => margin.bottom = style.margin.bottom,
                    Side::Left => margin.left = style.margin.left,
                }
            }
        }
        Page {
            number,
            width,
            height,
            margin,
            style,
            available_height: height - margin.vertical(),
        }
    }

    pub fn available_width(&self) -> f64 {
        (self.width - self.margin.horizontal()).max(0.0)
    }

    /// Where the next box goes.
    pub fn cursor_y(&self) -> f64 {
        self.height - self.margin.bottom - self.available_height
    }

    pub fn is_empty(&self) -> bool {
        self.available_height >= self.height - self.margin.vertical()
    }
}

struct Paginator<'a> {
    tree: &'a mut BoxTree,
    sheet: &'a Stylesheet,
    cache: &'a StyleCache,
    config: &'a PageConfig,
    fonts: &'a FontContext,
    surface: &'a mut dyn Surface,
}

/// Lay out the document's body onto pages drawn to `surface`. Returns the
/// number of pages.
pub fn paginate(
    tree: &mut BoxTree,
    sheet: &Stylesheet,
    cache: &StyleCache,
    config: &PageConfig,
    fonts: &FontContext,
    surface: &mut dyn Surface,
) -> Result<u32> {
    let mut paginator = Paginator {
        tree,
        sheet,
        cache,
        config,
        fonts,
        surface,
    };
    paginator.run()
}

impl Paginator<'_> {
    fn run(&mut self) -> Result<u32> {
        let mut queue: VecDeque<NodeId> = self.top_level_items().into();
        log::debug!("Paginating {} top-level boxes", queue.len());
        let mut page = self.start_page(1);

        while let Some(item) = queue.pop_front() {
            if matches!(self.tree.node(item).behavior, Behavior::Hidden) {
                continue;
            }
            if self.tree.node(item).style.page_break_before && !page.is_empty() {
                page = self.next_page(&page);
            }

            let ctx = LayoutContext {
                fonts: self.fonts,
                page_number: page.number,
            };
            self.tree.measure(item, page.available_width(), &ctx);
            if self.tree.fits(item, page.available_height) {
                self.place(item, &mut page, &ctx);
                if self.tree.node(item).style.page_break_after && !queue.is_empty() {
                    page = self.next_page(&page);
                }
                continue;
            }

            match self.tree.split(item, None, None, page.available_height, &ctx)? {
                (Some(top), rest) => {
                    self.tree.measure(top, page.available_width(), &ctx);
                    self.place(top, &mut page, &ctx);
                    match rest {
                        Some(rest) => {
                            queue.push_front(rest);
                            page = self.next_page(&page);
                        }
                        None => {
                            if self.tree.node(item).style.page_break_after && !queue.is_empty() {
                                page = self.next_page(&page);
                            }
                        }
                    }
                }
                (None, Some(rest)) if page.is_empty() => {
                    log::warn!(
                        "<{}> is {:.1}pt tall and cannot be split to fit the {:.1}pt of page {}; it will overflow",
                        self.tree.node(rest).tag,
                        self.tree.node(rest).height.unwrap_or(0.0),
                        page.available_height,
                        page.number
                    );
                    self.tree.measure(rest, page.available_width(), &ctx);
                    self.place(rest, &mut page, &ctx);
                    if !queue.is_empty() {
                        page = self.next_page(&page);
                    }
                }
                (None, Some(rest)) => {
                    queue.push_front(rest);
                    page = self.next_page(&page);
                }
                (None, None) => {
                    return Err(QuireError::Layout(format!(
                        "splitting <{}> produced neither half",
                        self.tree.node(item).tag
                    )))
                }
            }
        }

        self.finish_page(&page);
        Ok(page.number)
    }

    /// The body's children, with each run of inline content and text
    /// wrapped in an anonymous block.
    fn top_level_items(&mut self) -> Vec<NodeId> {
        let body = self.tree.body();
        let children = self.tree.node(body).children.clone();
        let mut items = Vec::new();
        let mut run: Vec<Child> = Vec::new();
        for child in children {
            match child {
                Child::Node(id) if !self.tree.node(id).behavior.is_inline() => {
                    self.flush_inline_run(body, &mut run, &mut items);
                    items.push(id);
                }
                Child::Text(text) if text.trim().is_empty() && run.is_empty() => {}
                other => run.push(other),
            }
        }
        self.flush_inline_run(body, &mut run, &mut items);
        items
    }

    fn flush_inline_run(&mut self, body: NodeId, run: &mut Vec<Child>, items: &mut Vec<NodeId>) {
        if run.is_empty() {
            return;
        }
        let style = self.tree.node(body).style.inherit(self.cache);
        let mut block = Node::new("#anonymous", Some(body), style);
        block.behavior = Behavior::Block;
        block.children = std::mem::take(run);
        let id = self.tree.add(block);
        let adopted: Vec<NodeId> = self.tree.node(id).child_nodes().collect();
        for child in adopted {
            self.tree.reparent(child, id);
        }
        items.push(id);
    }

    fn place(&mut self, id: NodeId, page: &mut Page, ctx: &LayoutContext) {
        let height = self.tree.node(id).height.unwrap_or(0.0);
        self.tree
            .draw(id, &mut *self.surface, page.margin.left, page.cursor_y(), ctx);
        page.available_height -= height;
    }

    fn start_page(&mut self, number: u32) -> Page {
        let page = Page::new(number, self.config, self.sheet, self.cache);
        log::debug!(
            "Starting page {} ({:.1} x {:.1}pt, {:.1}pt of content height)",
            page.number,
            page.width,
            page.height,
            page.available_height
        );
        self.surface.begin_page(page.width, page.height);
        page
    }

    fn next_page(&mut self, page: &Page) -> Page {
        self.finish_page(page);
        self.start_page(page.number + 1)
    }

    /// Draw the bottom-right page content, then close the page.
    fn finish_page(&mut self, page: &Page) {
        let text = render_content(&page.style.page_bottom_right_content, page.number);
        if !text.trim().is_empty() {
            let mut line = Line::default();
            for word in text.split_whitespace() {
                line.push(Word::new(&page.style, word), self.fonts);
            }
            let x = page.width - page.margin.right - line.width;
            let top = page.height - page.margin.bottom + (page.margin.bottom - line.height) / 2.0;
            let mut cursor = TextCursor::new(self.fonts);
            cursor.line(&mut *self.surface, &line, x, top);
            cursor.finish(&mut *self.surface);
        }
        self.surface.end_page();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawOp, RecordingSurface};
    use crate::markup;
    use crate::tree;

    fn render(html: &str, css: &str, config: &PageConfig) -> (RecordingSurface, u32) {
        let cache = StyleCache::new();
        let mut sheet = Stylesheet::user_agent().unwrap();
        sheet.add(css).unwrap();
        let doc = markup::parse(html).unwrap();
        let mut tree = tree::build(&doc.root, &sheet, &cache).unwrap();
        let fonts = FontContext::new();
        let mut surface = RecordingSurface::new();
        let pages = paginate(&mut tree, &sheet, &cache, config, &fonts, &mut surface).unwrap();
        (surface, pages)
    }

    /// A 200pt tall page with 20pt margins: 160pt of content.
    fn small_page() -> PageConfig {
        PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 200.0,
            },
            margin: Edges::uniform(20.0),
        }
    }

    const MONO: &str = "p { font-family: courier; font-size: 10pt; margin: 0 }";

    fn paragraphs(count: usize) -> String {
        (0..count).map(|i| format!("<p>line{i}</p>")).collect()
    }

    #[test]
    fn page_sizes_in_points() {
        assert_eq!(PageSize::A4.dimensions(), (595.28, 841.89));
        assert_eq!(PageSize::Letter.dimensions(), (612.0, 792.0));
        assert_eq!(
            PageSize::Custom {
                width: 100.0,
                height: 50.0
            }
            .dimensions(),
            (100.0, 50.0)
        );
    }

    #[test]
    fn options_default_from_partial_json() {
        let options = RenderOptions::from_json(r#"{ "page": { "size": "Letter" } }"#).unwrap();
        assert_eq!(options.page.size, PageSize::Letter);
        assert_eq!(options.page.margin, Edges::uniform(72.0));
        assert!(options.user_agent_stylesheet);

        let options = RenderOptions::from_json(r#"{ "userAgentStylesheet": false }"#).unwrap();
        assert!(!options.user_agent_stylesheet);
        assert!(matches!(
            RenderOptions::from_json("{ \"page\": 3 }"),
            Err(QuireError::Config { .. })
        ));
    }

    #[test]
    fn content_flows_onto_new_pages() {
        // thirteen 12pt lines fit in 160pt, thirty need three pages
        let (surface, pages) = render(&paragraphs(30), MONO, &small_page());
        assert_eq!(pages, 3);
        assert_eq!(surface.page_count(), 3);
        assert!(surface.page_text(1).starts_with("line0 "));
        assert!(surface.page_text(2).starts_with("line13 "));
        assert!(surface.page_text(3).ends_with("line29"));
    }

    #[test]
    fn page_break_before_starts_a_page() {
        let html = "<p>one</p><p class=\"new\">two</p><p>three</p>";
        let css = format!("{MONO} .new {{ page-break-before: always }}");
        let (surface, pages) = render(html, &css, &small_page());
        assert_eq!(pages, 2);
        assert_eq!(surface.page_text(1), "one");
        assert_eq!(surface.page_text(2), "two three");
    }

    #[test]
    fn page_break_after_on_the_last_box_adds_no_page() {
        let css = format!("{MONO} p {{ page-break-after: always }}");
        let (_, pages) = render("<p>one</p><p>two</p>", &css, &small_page());
        assert_eq!(pages, 2);
    }

    #[test]
    fn unsplittable_box_taller_than_a_page_overflows_once() {
        let words = vec!["word"; 200].join(" ");
        let html = format!("<p>before</p><p class=\"big\">{words}</p><p>after</p>");
        let css = format!("{MONO} .big {{ page-break-inside: avoid }}");
        let (surface, pages) = render(&html, &css, &small_page());
        assert_eq!(pages, 3);
        assert_eq!(surface.page_text(1), "before");
        assert!(surface.page_text(2).starts_with("word"));
        assert_eq!(surface.page_text(3), "after");
    }

    #[test]
    fn page_rules_override_margins() {
        let css = format!("{MONO} @page {{ margin: 10pt }} @page :first {{ margin-left: 50pt }}");
        let html = format!("{}<p class=\"new\">x</p>", paragraphs(1));
        let css = format!("{css} .new {{ page-break-before: always }}");
        let (surface, _) = render(&html, &css, &small_page());
        let placed = surface.placed_text();
        assert_eq!(placed[0].x, 50.0);
        assert_eq!(placed[1].x, 10.0);
    }

    #[test]
    fn bottom_right_content_carries_the_page_number() {
        let css = format!(
            r#"{MONO} @page {{ @bottom-right {{ content: "Page " counter(page) }} }}"#
        );
        let (surface, pages) = render(&paragraphs(20), &css, &small_page());
        assert_eq!(pages, 2);
        assert!(surface.page_text(1).ends_with("Page 1"));
        assert!(surface.page_text(2).ends_with("Page 2"));
        let last = surface.placed_text().into_iter().last().unwrap();
        assert!(last.y > 180.0);
    }

    #[test]
    fn loose_inline_content_gets_an_anonymous_block() {
        let (surface, pages) = render("<body>loose <b>text</b><p>para</p></body>", MONO, &small_page());
        assert_eq!(pages, 1);
        assert_eq!(surface.page_text(1), "loose text para");
        let begins = surface
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::BeginPage { .. }))
            .count();
        assert_eq!(begins, 1);
    }
}
