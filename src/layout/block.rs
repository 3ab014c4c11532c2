//! Flow boxes: blocks, list items, captions and table cells.
//!
//! A flow box packs its inline content into lines and stacks block children
//! between them. Splitting walks those rows top to bottom: lines are atomic,
//! a straddling block child is split recursively.

use super::{LayoutContext, Split};
use crate::draw::{draw_border_and_background, Surface, TextCursor};
use crate::error::Result;
use crate::style::{Edges, TextAlign, VerticalAlign};
use crate::text::{self, FlowItem, Line, LineBox};
use crate::tree::{Behavior, BoxTree, Child, NodeId};

impl BoxTree {
    /// Greedy line packing. A word starts a new line when it would push the
    /// line past the available width; `<br>` closes the current line; a block
    /// child always takes a row of its own.
    pub(crate) fn wrap_flow(&mut self, id: NodeId, available_width: f64, ctx: &LayoutContext) -> (f64, f64) {
        let frame = self.frame(id);
        let inner = (available_width - frame.horizontal()).max(0.0);
        let items = match self.node_mut(id).flow.take() {
            Some(items) => items,
            None => text::linearize(self, id),
        };

        let mut lines = Vec::new();
        let mut line: Option<Line> = None;
        let mut max_width: f64 = 0.0;
        for item in &items {
            match item {
                FlowItem::Word(word) => {
                    let width = word.width(ctx.fonts);
                    let full = line
                        .as_ref()
                        .map_or(true, |current| current.width_with(width, ctx.fonts) > inner);
                    if full {
                        if let Some(done) = line.take() {
                            lines.push(LineBox::Text(done));
                        }
                    }
                    let current = line.get_or_insert_with(Line::default);
                    current.push(word.clone(), ctx.fonts);
                    max_width = max_width.max(current.width);
                }
                FlowItem::Break(br) => {
                    let mut current = line.take().unwrap_or_default();
                    current.height = current.height.max(self.node(*br).style.leading());
                    current.break_after = Some(*br);
                    lines.push(LineBox::Text(current));
                }
                FlowItem::Block(child) => {
                    if let Some(done) = line.take() {
                        lines.push(LineBox::Text(done));
                    }
                    let (width, _) = self.measure(*child, inner, ctx);
                    max_width = max_width.max(width);
                    lines.push(LineBox::Block(*child));
                }
            }
        }
        if let Some(done) = line {
            lines.push(LineBox::Text(done));
        }

        let content: f64 = lines.iter().map(|row| self.row_height(row)).sum();
        let height = frame.vertical() + content;
        let node = self.node_mut(id);
        node.flow = Some(items);
        node.lines = lines;
        node.width = Some(available_width);
        node.height = Some(height);
        (max_width + frame.horizontal(), height)
    }

    fn row_height(&self, row: &LineBox) -> f64 {
        match row {
            LineBox::Text(line) => line.height,
            LineBox::Block(child) => self.node(*child).height.unwrap_or(0.0),
        }
    }

    /// Height of the stacked lines and blocks, without the frame.
    pub(crate) fn content_height(&self, id: NodeId) -> f64 {
        self.node(id).lines.iter().map(|row| self.row_height(row)).sum()
    }

    /// How far below the box's top edge its first line starts. Cells honor
    /// `vertical-align` inside their forced row height; split and draw both
    /// use this so they agree on where content sits.
    pub(crate) fn content_offset(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        let frame = self.frame(id);
        if !matches!(node.behavior, Behavior::TableCell { .. }) {
            return frame.top;
        }
        let height = node.height.unwrap_or(0.0);
        let content = self.content_height(id);
        match node.style.vertical_align {
            VerticalAlign::Top => frame.top,
            VerticalAlign::Middle => (height - content) / 2.0,
            VerticalAlign::Bottom => height - (content + frame.bottom),
        }
    }

    pub(crate) fn split_flow(
        &mut self,
        id: NodeId,
        top_parent: Option<NodeId>,
        bottom_parent: Option<NodeId>,
        available_height: f64,
        ctx: &LayoutContext,
    ) -> Result<Split> {
        let node = self.node(id);
        if !node.style.page_break_inside || node.lines.is_empty() {
            return Ok((None, Some(id)));
        }

        let limit = available_height - self.frame(id).bottom;
        let mut consumed = self.content_offset(id);
        if consumed >= limit {
            // the frame and alignment offset alone use up the space
            return Ok((None, Some(id)));
        }

        let lines = self.node(id).lines.clone();
        let mut index = lines.len();
        for (i, row) in lines.iter().enumerate() {
            let height = self.row_height(row);
            if consumed + height > limit {
                index = i;
                break;
            }
            consumed += height;
        }
        if index == lines.len() {
            return Ok((Some(id), None));
        }
        log::trace!("splitting <{}> at row {} of {}", self.node(id).tag, index, lines.len());

        let mut top_lines = lines[..index].to_vec();
        let mut bottom_lines = lines[index + 1..].to_vec();
        match &lines[index] {
            LineBox::Text(_) => bottom_lines.insert(0, lines[index].clone()),
            LineBox::Block(child) => {
                // the child's halves are reparented when the clones adopt them
                let (child_top, child_bottom) = self.split(*child, None, None, limit - consumed, ctx)?;
                top_lines.extend(child_top.map(LineBox::Block));
                if let Some(child_bottom) = child_bottom {
                    bottom_lines.insert(0, LineBox::Block(child_bottom));
                }
            }
        }
        if top_lines.is_empty() {
            return Ok((None, Some(id)));
        }

        let top = self.clone_node(id, top_parent);
        self.adopt(top, top_lines);
        if bottom_lines.is_empty() {
            return Ok((Some(top), None));
        }
        let bottom = self.clone_node(id, bottom_parent);
        self.adopt(bottom, bottom_lines);
        Ok((Some(top), Some(bottom)))
    }

    /// Hand `lines` over to a split half as its content.
    fn adopt(&mut self, half: NodeId, lines: Vec<LineBox>) {
        let mut children = Vec::new();
        for row in &lines {
            if let LineBox::Block(child) = row {
                self.reparent(*child, half);
                children.push(Child::Node(*child));
            }
        }
        let node = self.node_mut(half);
        node.children = children;
        node.flow = Some(text::into_flow(lines));
    }

    pub(crate) fn draw_flow(
        &mut self,
        id: NodeId,
        surface: &mut dyn Surface,
        x: f64,
        y: f64,
        ctx: &LayoutContext,
    ) -> (f64, f64) {
        let frame = self.frame(id);
        let node = self.node(id);
        let style = node.style.clone();
        let width = node.width.unwrap_or(0.0);
        let height = node.height.unwrap_or(0.0);
        if !style.visibility {
            return (x, y + height);
        }

        let inset = match node.behavior {
            Behavior::TableCell { .. } => Edges::default(),
            _ => style.margin,
        };
        draw_border_and_background(
            surface,
            &style,
            x + inset.left,
            y + inset.top,
            width - inset.horizontal(),
            height - inset.vertical(),
        );

        let inner_x = x + frame.left;
        let inner_width = width - frame.horizontal();
        let mut top = y + self.content_offset(id);
        let lines = std::mem::take(&mut self.node_mut(id).lines);
        let mut cursor = TextCursor::new(ctx.fonts);
        for row in &lines {
            match row {
                LineBox::Text(line) => {
                    let dx = match style.text_align {
                        TextAlign::Right => inner_width - line.width,
                        TextAlign::Center => (inner_width - line.width) / 2.0,
                        TextAlign::Left | TextAlign::Justify => 0.0,
                    };
                    if !line.is_empty() {
                        cursor.line(surface, line, inner_x + dx, top);
                    }
                    top += line.height;
                }
                LineBox::Block(child) => {
                    cursor.finish(surface);
                    let (_, below) = self.draw(*child, surface, inner_x, top, ctx);
                    top = below;
                }
            }
        }
        cursor.finish(surface);
        self.node_mut(id).lines = lines;
        (x, y + height)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::build;
    use super::*;
    use crate::draw::RecordingSurface;
    use crate::font::FontContext;

    const MONO: &str = "p { font-family: courier; font-size: 10pt; margin: 0 }";

    fn ctx(fonts: &FontContext) -> LayoutContext<'_> {
        LayoutContext { fonts, page_number: 1 }
    }

    fn twenty_words() -> String {
        format!("<p>{}</p>", vec!["abcd"; 20].join(" "))
    }

    fn words_per_line(tree: &BoxTree, id: NodeId) -> Vec<usize> {
        tree.node(id)
            .lines
            .iter()
            .map(|row| match row {
                LineBox::Text(line) => line.words.len(),
                LineBox::Block(_) => 0,
            })
            .collect()
    }

    #[test]
    fn twenty_words_five_per_line() {
        let fonts = FontContext::new();
        let (mut tree, p) = build(&twenty_words(), MONO);
        // courier 10pt: a word is 24pt, a space 6pt, so five words take 144pt
        let (width, height) = tree.measure(p, 144.5, &ctx(&fonts));
        assert_eq!(words_per_line(&tree, p), vec![5, 5, 5, 5]);
        assert_eq!(width, 144.0);
        assert_eq!(height, 48.0);
    }

    #[test]
    fn lines_never_exceed_width_except_long_words() {
        let fonts = FontContext::new();
        let (mut tree, p) = build("<p>a bb ccc dddddddddddddddddddd e ff</p>", MONO);
        tree.measure(p, 60.0, &ctx(&fonts));
        for row in &tree.node(p).lines {
            if let LineBox::Text(line) = row {
                assert!(line.width <= 60.0 || line.words.len() == 1);
            }
        }
    }

    #[test]
    fn br_closes_the_line() {
        let fonts = FontContext::new();
        let (mut tree, p) = build("<p>one<br>two three</p>", MONO);
        tree.measure(p, 500.0, &ctx(&fonts));
        assert_eq!(words_per_line(&tree, p), vec![1, 2]);
    }

    #[test]
    fn styled_halves_of_a_word_stay_one_word() {
        let fonts = FontContext::new();
        let (mut tree, p) = build("<p><b>wor</b>ld next</p>", MONO);
        tree.measure(p, 500.0, &ctx(&fonts));
        let LineBox::Text(line) = &tree.node(p).lines[0] else {
            panic!("expected a text line")
        };
        assert_eq!(line.words.len(), 2);
        assert_eq!(line.words[0].parts.len(), 2);
        assert_eq!(line.words[0].text(), "world");
    }

    #[test]
    fn block_children_take_their_own_rows() {
        let fonts = FontContext::new();
        let (mut tree, div) = build("<div>before<p>inside</p>after</div>", MONO);
        let (_, height) = tree.measure(div, 500.0, &ctx(&fonts));
        assert_eq!(tree.node(div).lines.len(), 3);
        assert!(matches!(tree.node(div).lines[1], LineBox::Block(_)));
        assert_eq!(height, 14.0 + 12.0 + 14.0);
    }

    #[test]
    fn split_at_a_line_boundary() {
        let fonts = FontContext::new();
        let ctx = ctx(&fonts);
        let (mut tree, p) = build(&twenty_words(), MONO);
        let original = tree.text_content(p);
        tree.measure(p, 144.5, &ctx);

        let (top, bottom) = tree.split(p, None, None, 30.0, &ctx).unwrap();
        let (top, bottom) = (top.unwrap(), bottom.unwrap());
        tree.measure(top, 144.5, &ctx);
        tree.measure(bottom, 144.5, &ctx);
        assert_eq!(words_per_line(&tree, top), vec![5, 5]);
        assert_eq!(words_per_line(&tree, bottom), vec![5, 5]);

        let mut rejoined = tree.text_content(top);
        rejoined.extend(tree.text_content(bottom));
        assert_eq!(rejoined, original);
    }

    #[test]
    fn less_than_one_line_moves_everything() {
        let fonts = FontContext::new();
        let ctx = ctx(&fonts);
        let (mut tree, p) = build(&twenty_words(), MONO);
        tree.measure(p, 144.5, &ctx);
        assert_eq!(tree.split(p, None, None, 5.0, &ctx).unwrap(), (None, Some(p)));
        assert_eq!(tree.split(p, None, None, 48.0, &ctx).unwrap(), (Some(p), None));
    }

    #[test]
    fn straddling_child_is_split_recursively() {
        let fonts = FontContext::new();
        let ctx = ctx(&fonts);
        let html = format!("<div><p>first</p>{}</div>", twenty_words());
        let (mut tree, div) = build(&html, MONO);
        let original = tree.text_content(div);
        tree.measure(div, 144.5, &ctx);

        // 12pt for the first paragraph leaves room for two lines of the second
        let (top, bottom) = tree.split(div, None, None, 40.0, &ctx).unwrap();
        let (top, bottom) = (top.unwrap(), bottom.unwrap());
        let (_, top_height) = tree.measure(top, 144.5, &ctx);
        tree.measure(bottom, 144.5, &ctx);
        assert_eq!(top_height, 36.0);
        assert_eq!(tree.node(top).lines.len(), 2);

        let mut rejoined = tree.text_content(top);
        rejoined.extend(tree.text_content(bottom));
        assert_eq!(rejoined, original);
    }

    #[test]
    fn unsplittable_first_child_moves_the_parent_without_clones() {
        let fonts = FontContext::new();
        let ctx = ctx(&fonts);
        let html = format!("<div>{}</div>", twenty_words());
        let css = format!("{MONO} p {{ page-break-inside: avoid }}");
        let (mut tree, div) = build(&html, &css);
        tree.measure(div, 144.5, &ctx);
        let boxes = tree.len();
        assert_eq!(tree.split(div, None, None, 20.0, &ctx).unwrap(), (None, Some(div)));
        assert_eq!(tree.len(), boxes);
    }

    #[test]
    fn avoid_page_break_inside_is_never_split() {
        let fonts = FontContext::new();
        let ctx = ctx(&fonts);
        let css = format!("{MONO} p {{ page-break-inside: avoid }}");
        let (mut tree, p) = build(&twenty_words(), &css);
        tree.measure(p, 144.5, &ctx);
        assert_eq!(tree.split(p, None, None, 30.0, &ctx).unwrap(), (None, Some(p)));
    }

    #[test]
    fn centered_text_is_offset() {
        let fonts = FontContext::new();
        let ctx = ctx(&fonts);
        let css = format!("{MONO} p {{ text-align: center }}");
        let (mut tree, p) = build("<p>abcd</p>", &css);
        tree.measure(p, 100.0, &ctx);
        let mut surface = RecordingSurface::new();
        tree.draw(p, &mut surface, 0.0, 0.0, &ctx);
        let placed = surface.placed_text();
        assert_eq!(placed[0].x, (100.0 - 24.0) / 2.0);
    }
}
