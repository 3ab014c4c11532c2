//! # Page-Aware Layout
//!
//! Every box answers four questions, dispatched on its [`Behavior`]:
//!
//! 1. `measure(available_width)`: how wide and tall are you at this width?
//! 2. `fits(available_height)`: do you fit in what is left of the page?
//! 3. `split(top_parent, bottom_parent, available_height)`: if not, give me
//!    a top half that fits and a bottom half for the next page.
//! 4. `draw(surface, x, y)`: paint yourself with your top-left corner here.
//!
//! Splitting never slices a laid-out canvas. It partitions a box's content
//! into two fresh boxes (clones of the original with the same style) that
//! are each measured again on their own page. Either half may be `None`:
//! `(Some(b), None)` means everything fits, `(None, Some(b))` means nothing
//! does and the whole box moves to the next page.
//!
//! Flow boxes (blocks, list items, captions, cells) live in [`block`];
//! tables, row groups and rows in [`table`]; the page loop in [`page`].

pub mod block;
pub mod page;
pub mod table;

pub use page::{paginate, PageConfig, PageSize, RenderOptions};

use crate::draw::Surface;
use crate::error::Result;
use crate::font::FontContext;
use crate::style::{BorderCollapse, Edges};
use crate::tree::{Behavior, BoxTree, NodeId};

/// Per-page state shared by every layout call.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    pub fonts: &'a FontContext,
    /// The page being filled; header groups use it to draw once per page.
    pub page_number: u32,
}

/// The two halves of a split. Either may be missing.
pub type Split = (Option<NodeId>, Option<NodeId>);

impl BoxTree {
    /// The margin + border + padding envelope of a box, per behavior.
    pub fn frame(&self, id: NodeId) -> Edges {
        let node = self.node(id);
        let style = &node.style;
        match &node.behavior {
            Behavior::TableRow => {
                if self.is_collapsed(id) {
                    Edges {
                        top: style.border_width.top,
                        bottom: style.border_width.bottom,
                        ..Edges::default()
                    }
                } else {
                    Edges::default()
                }
            }
            Behavior::TableCell { .. } => add_edges(&style.border_width, &style.padding, None),
            Behavior::TableRowGroup { .. }
            | Behavior::TableColumnGroup(_)
            | Behavior::TableColumn { .. }
            | Behavior::Hidden => Edges::default(),
            _ => add_edges(&style.margin, &style.border_width, Some(&style.padding)),
        }
    }

    /// Whether the table a box belongs to collapses its borders.
    pub(crate) fn is_collapsed(&self, id: NodeId) -> bool {
        self.table_of(id)
            .is_some_and(|table| self.node(table).style.border_collapse == BorderCollapse::Collapse)
    }

    /// Lay out `id` at `available_width`. Returns the natural width and the
    /// height, and leaves both on the node. Idempotent for an unchanged box.
    pub fn measure(&mut self, id: NodeId, available_width: f64, ctx: &LayoutContext) -> (f64, f64) {
        match &self.node(id).behavior {
            Behavior::Block
            | Behavior::Inline
            | Behavior::ListItem
            | Behavior::TableCaption
            | Behavior::TableCell { .. } => self.wrap_flow(id, available_width, ctx),
            Behavior::Table(_) => self.wrap_table(id, available_width, ctx),
            Behavior::TableRowGroup { .. } => {
                let height = self.wrap_group(id, available_width, ctx);
                (available_width, height)
            }
            Behavior::TableRow => self.wrap_row_in_table(id, available_width, ctx),
            Behavior::TableColumnGroup(_) | Behavior::TableColumn { .. } | Behavior::Hidden => {
                let node = self.node_mut(id);
                node.width = Some(0.0);
                node.height = Some(0.0);
                (0.0, 0.0)
            }
        }
    }

    /// `height <= available_height` after the last measure.
    pub fn fits(&self, id: NodeId, available_height: f64) -> bool {
        self.node(id).height.unwrap_or(0.0) <= available_height
    }

    /// Partition `id` into a part that fits in `available_height` and the
    /// rest. New halves are created under `top_parent` / `bottom_parent`
    /// (or the original parent when `None`).
    pub fn split(
        &mut self,
        id: NodeId,
        top_parent: Option<NodeId>,
        bottom_parent: Option<NodeId>,
        available_height: f64,
        ctx: &LayoutContext,
    ) -> Result<Split> {
        if self.fits(id, available_height) {
            return Ok((Some(id), None));
        }
        match &self.node(id).behavior {
            Behavior::Block
            | Behavior::Inline
            | Behavior::ListItem
            | Behavior::TableCaption
            | Behavior::TableCell { .. } => {
                self.split_flow(id, top_parent, bottom_parent, available_height, ctx)
            }
            Behavior::Table(_) => self.split_table(id, top_parent, bottom_parent, available_height, ctx),
            Behavior::TableRow => self.split_row(id, top_parent, bottom_parent, available_height, ctx),
            // header and footer groups repeat whole; they are never split
            _ => Ok((None, Some(id))),
        }
    }

    /// Paint `id` with its top-left corner at `(x, y)`. Returns the position
    /// just below it.
    pub fn draw(&mut self, id: NodeId, surface: &mut dyn Surface, x: f64, y: f64, ctx: &LayoutContext) -> (f64, f64) {
        match &self.node(id).behavior {
            Behavior::Block
            | Behavior::Inline
            | Behavior::ListItem
            | Behavior::TableCaption
            | Behavior::TableCell { .. } => self.draw_flow(id, surface, x, y, ctx),
            Behavior::Table(_) => self.draw_table(id, surface, x, y, ctx),
            Behavior::TableRowGroup { .. } => self.draw_group(id, surface, x, y, ctx),
            Behavior::TableRow => self.draw_row(id, surface, x, y, ctx),
            _ => (x, y),
        }
    }
}

fn add_edges(a: &Edges, b: &Edges, c: Option<&Edges>) -> Edges {
    let c = c.copied().unwrap_or_default();
    Edges {
        top: a.top + b.top + c.top,
        right: a.right + b.right + c.right,
        bottom: a.bottom + b.bottom + c.bottom,
        left: a.left + b.left + c.left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Stylesheet;
    use crate::markup;
    use crate::style::StyleCache;
    use crate::tree;

    pub(crate) fn build(html: &str, css: &str) -> (BoxTree, NodeId) {
        let cache = StyleCache::new();
        let mut sheet = Stylesheet::user_agent().unwrap();
        sheet.extend(Stylesheet::parse(css).unwrap());
        let doc = markup::parse(html).unwrap();
        let tree = tree::build(&doc.root, &sheet, &cache).unwrap();
        let first = tree.node(tree.root()).child_nodes().next().unwrap();
        (tree, first)
    }

    #[test]
    fn frames_per_behavior() {
        let (tree, div) = build(
            "<div><table><tr><td>a</td></tr></table></div>",
            "div { margin: 1pt; border: 2pt solid black; padding: 3pt } td { padding: 4pt; margin: 9pt }",
        );
        assert_eq!(tree.frame(div), Edges::uniform(6.0));
        let table = tree.node(div).child_nodes().next().unwrap();
        let Behavior::Table(state) = &tree.node(table).behavior else {
            panic!("not a table")
        };
        let row = state.rows[0];
        assert_eq!(tree.frame(row), Edges::default());
        let cell = tree.node(row).child_nodes().next().unwrap();
        assert_eq!(tree.frame(cell), Edges::uniform(4.0));
    }

    #[test]
    fn collapsed_rows_have_vertical_border_frame() {
        let (tree, table) = build(
            "<table><tr><td>a</td></tr></table>",
            "table { border-collapse: collapse } tr { border: 1.5pt solid black }",
        );
        let Behavior::Table(state) = &tree.node(table).behavior else {
            panic!("not a table")
        };
        let frame = tree.frame(state.rows[0]);
        assert_eq!((frame.top, frame.right, frame.bottom, frame.left), (1.5, 0.0, 1.5, 0.0));
    }

    #[test]
    fn measure_is_idempotent() {
        let fonts = FontContext::new();
        let ctx = LayoutContext {
            fonts: &fonts,
            page_number: 1,
        };
        let (mut tree, p) = build("<p>some words to wrap across a few lines of text</p>", "");
        let first = tree.measure(p, 80.0, &ctx);
        let second = tree.measure(p, 80.0, &ctx);
        assert_eq!(first, second);
        assert!(tree.fits(p, first.1));
        assert!(!tree.fits(p, first.1 - 1.0));
    }
}
