//! # Inline Text
//!
//! Words, lines and the flattening of inline content into flow items.
//!
//! A [`Word`] is a run of non-whitespace text that may change style in the
//! middle (`<b>wor</b>ld`); adjacent parts with the same style are merged
//! so drawing switches fonts as rarely as possible. A [`Line`] is a row of
//! words no wider than the available width, unless a single word alone is
//! wider.

use crate::font::FontContext;
use crate::style::Style;
use crate::tree::{Behavior, BoxTree, Child, NodeId};

/// A piece of a word set in one style.
#[derive(Debug, Clone)]
pub struct StyledPart {
    pub style: Style,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Word {
    pub parts: Vec<StyledPart>,
}

impl Word {
    pub fn new(style: &Style, text: &str) -> Self {
        Word {
            parts: vec![StyledPart {
                style: style.clone(),
                text: text.to_string(),
            }],
        }
    }

    /// Append more text, merging into the last part when the style matches.
    pub fn push(&mut self, style: &Style, text: &str) {
        match self.parts.last_mut() {
            Some(last) if last.style == *style => last.text.push_str(text),
            _ => self.parts.push(StyledPart {
                style: style.clone(),
                text: text.to_string(),
            }),
        }
    }

    pub fn width(&self, fonts: &FontContext) -> f64 {
        self.parts.iter().map(|p| fonts.measure(&p.text, &p.style)).sum()
    }

    /// The tallest leading among the parts.
    pub fn height(&self) -> f64 {
        self.parts.iter().map(|p| p.style.leading()).fold(0.0, f64::max)
    }

    /// The space that follows this word, set in its last part's style.
    pub fn space_width(&self, fonts: &FontContext) -> f64 {
        self.parts.last().map_or(0.0, |p| fonts.space_width(&p.style))
    }

    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

/// One unit considered by line packing.
#[derive(Debug, Clone)]
pub enum FlowItem {
    Word(Word),
    /// An explicit line break (`<br>`), carrying its box for the leading.
    Break(NodeId),
    /// A non-inline child box; it always takes a line of its own.
    Block(NodeId),
}

#[derive(Debug, Clone, Default)]
pub struct Line {
    pub words: Vec<Word>,
    /// Sum of word widths plus the spaces between them.
    pub width: f64,
    /// Largest leading on the line.
    pub height: f64,
    /// The `<br>` that closed this line, if any.
    pub break_after: Option<NodeId>,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Width of the line if `word` were appended.
    pub fn width_with(&self, word_width: f64, fonts: &FontContext) -> f64 {
        match self.words.last() {
            Some(last) => self.width + last.space_width(fonts) + word_width,
            None => word_width,
        }
    }

    pub fn push(&mut self, word: Word, fonts: &FontContext) {
        self.width = self.width_with(word.width(fonts), fonts);
        self.height = self.height.max(word.height());
        self.words.push(word);
    }
}

/// A row in a flow box's content: a line of words or a block child.
#[derive(Debug, Clone)]
pub enum LineBox {
    Text(Line),
    Block(NodeId),
}

/// Turn packed lines back into the flow items they were made from, so a
/// split half can be packed again.
pub fn into_flow(lines: Vec<LineBox>) -> Vec<FlowItem> {
    let mut items = Vec::new();
    for line in lines {
        match line {
            LineBox::Text(line) => {
                items.extend(line.words.into_iter().map(FlowItem::Word));
                items.extend(line.break_after.map(FlowItem::Break));
            }
            LineBox::Block(id) => items.push(FlowItem::Block(id)),
        }
    }
    items
}

/// Flatten the inline content of `id` into flow items: depth first through
/// inline children, but never into block-level ones.
pub fn linearize(tree: &BoxTree, id: NodeId) -> Vec<FlowItem> {
    let mut items = Vec::new();
    let mut word_open = false;
    collect(tree, id, &mut items, &mut word_open);
    items
}

fn collect(tree: &BoxTree, id: NodeId, items: &mut Vec<FlowItem>, word_open: &mut bool) {
    let node = tree.node(id);
    for child in &node.children {
        match child {
            Child::Text(text) => push_text(&node.style, text, items, word_open),
            Child::Node(child_id) => {
                let child = tree.node(*child_id);
                match &child.behavior {
                    Behavior::Hidden => {}
                    Behavior::Inline if child.tag == "br" => {
                        items.push(FlowItem::Break(*child_id));
                        *word_open = false;
                    }
                    Behavior::Inline => collect(tree, *child_id, items, word_open),
                    _ => {
                        items.push(FlowItem::Block(*child_id));
                        *word_open = false;
                    }
                }
            }
        }
    }
}

/// Split a text run on whitespace. A run that does not start with
/// whitespace continues the previous word.
fn push_text(style: &Style, text: &str, items: &mut Vec<FlowItem>, word_open: &mut bool) {
    if text.is_empty() {
        return;
    }
    if text.starts_with(char::is_whitespace) {
        *word_open = false;
    }
    let mut words = text.split_whitespace();
    if *word_open {
        if let (Some(FlowItem::Word(last)), Some(first)) = (items.last_mut(), words.clone().next()) {
            last.push(style, first);
            words.next();
        }
    }
    items.extend(words.map(|w| FlowItem::Word(Word::new(style, w))));
    *word_open = !text.ends_with(char::is_whitespace);
}
