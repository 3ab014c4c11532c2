//! The Box Tree Builder.
//!
//! Walks the repaired markup tree and creates one box per element. The
//! cascade runs as soon as a box exists, before any of its children, so
//! structural selectors see final sibling positions. `last` comes from a
//! one-element lookahead over the sibling stream.

use std::collections::HashMap;
use std::iter::Peekable;

use super::behavior::{self, Behavior, ColumnGroupState, ColumnSpec, RowGroupKind};
use super::{BoxTree, Child, Node, NodeId};
use crate::css::Stylesheet;
use crate::error::{QuireError, Result};
use crate::markup::{Content, Element};
use crate::style::{Declaration, Display, StyleCache};

/// The display a tag gets before any stylesheet is consulted.
pub fn tag_display(tag: &str) -> Display {
    match tag {
        "span" | "a" | "b" | "strong" | "i" | "em" | "u" | "s" | "strike" | "del" | "ins"
        | "small" | "big" | "sub" | "sup" | "code" | "tt" | "font" | "label" | "abbr" | "br"
        | "img" | "q" | "cite" | "mark" | "var" | "kbd" | "samp" => Display::Inline,
        "li" => Display::ListItem,
        "table" => Display::Table,
        "caption" => Display::TableCaption,
        "colgroup" => Display::TableColumnGroup,
        "col" => Display::TableColumn,
        "thead" => Display::TableHeaderGroup,
        "tbody" => Display::TableRowGroup,
        "tfoot" => Display::TableFooterGroup,
        "tr" => Display::TableRow,
        "td" | "th" => Display::TableCell,
        "head" | "style" | "script" | "title" | "meta" | "link" | "template" => Display::None,
        _ => Display::Block,
    }
}

/// Build the styled box tree for `root` (the synthetic markup root).
pub fn build(root: &Element, sheet: &Stylesheet, cache: &StyleCache) -> Result<BoxTree> {
    let mut root_node = Node::new("#root", None, cache.default_style());
    root_node.style = root_node
        .style
        .set(cache, &[Declaration::Display(Display::Block)]);
    let mut builder = Builder {
        tree: BoxTree::new(root_node),
        sheet,
        cache,
    };
    let root_id = builder.tree.root();
    builder.build_children(root_id, &root.children)?;
    Ok(builder.tree)
}

struct Builder<'a> {
    tree: BoxTree,
    sheet: &'a Stylesheet,
    cache: &'a StyleCache,
}

impl<'a> Builder<'a> {
    fn build_children(&mut self, parent: NodeId, content: &[Content]) -> Result<()> {
        let mut position = 0;
        let mut of_type: HashMap<&str, usize> = HashMap::new();
        let mut elements: Peekable<_> = content.iter().peekable();

        while let Some(item) = elements.next() {
            match item {
                Content::Text(text) => self.add_text(parent, text)?,
                Content::Element(element) => {
                    position += 1;
                    let type_position = of_type.entry(element.tag.as_str()).or_insert(0);
                    *type_position += 1;
                    let last = !elements
                        .clone()
                        .any(|rest| matches!(rest, Content::Element(_)));
                    self.build_element(parent, element, position, *type_position, last)?;
                }
            }
        }
        Ok(())
    }

    fn add_text(&mut self, parent: NodeId, text: &str) -> Result<()> {
        let node = self.tree.node_mut(parent);
        if node.behavior.text_allowed() {
            node.children.push(Child::Text(text.to_string()));
            return Ok(());
        }
        if text.trim().is_empty() || matches!(node.behavior, Behavior::Hidden) {
            return Ok(());
        }
        Err(QuireError::Structure {
            tag: "#text".to_string(),
            parent: node.tag.clone(),
        })
    }

    fn build_element(
        &mut self,
        parent: NodeId,
        element: &Element,
        position: usize,
        position_of_type: usize,
        last: bool,
    ) -> Result<()> {
        let parent_style = self.tree.node(parent).style.clone();
        let base = parent_style
            .inherit(self.cache)
            .set(self.cache, &[Declaration::Display(tag_display(&element.tag))]);

        let mut node = Node::new(&element.tag, Some(parent), base);
        node.id = element.attr("id").map(str::to_string);
        node.classes = element
            .attr("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        node.attrs = element.attrs.clone();
        node.position = position;
        node.position_of_type = position_of_type;
        node.last = last;

        let id = self.tree.append(parent, node);

        let style = {
            let node = self.tree.node(id);
            self.sheet.apply(self.tree.element(id), &node.style, self.cache)
        };
        let display = style.display;
        self.tree.node_mut(id).style = style;

        let behavior = {
            let parent_node = self.tree.node(parent);
            let parent_info = (parent != self.tree.root())
                .then_some((parent_node.tag.as_str(), &parent_node.behavior));
            behavior::select(&element.tag, display, parent_info, |name| {
                element.attr(name).map(str::to_string)
            })?
        };
        self.tree.node_mut(id).behavior = behavior;
        self.attach(parent, id, element)?;

        if !matches!(self.tree.node(id).behavior, Behavior::Hidden) {
            self.build_children(id, &element.children)?;
        }
        self.finish(id, element);
        Ok(())
    }

    /// Register table-context boxes with their table.
    fn attach(&mut self, parent: NodeId, id: NodeId, element: &Element) -> Result<()> {
        let duplicate = |tree: &BoxTree| QuireError::DuplicateTableSection {
            tag: element.tag.clone(),
            display: tree.node(id).style.display.keyword().to_string(),
        };
        match self.tree.node(id).behavior.clone() {
            Behavior::Table(_) => {
                // every table owns an implicit column group until markup provides one
                let mut columns = Node::new("colgroup", Some(id), self.tree.node(id).style.inherit(self.cache));
                columns.style = columns
                    .style
                    .set(self.cache, &[Declaration::Display(Display::TableColumnGroup)]);
                columns.behavior = Behavior::TableColumnGroup(ColumnGroupState::default());
                let columns = self.tree.add(columns);
                if let Behavior::Table(state) = &mut self.tree.node_mut(id).behavior {
                    state.columns = Some(columns);
                    state.implicit_columns = true;
                }
            }
            Behavior::TableCaption => {
                let exists = self.table_state(parent).is_some_and(|t| t.caption.is_some());
                if exists {
                    return Err(duplicate(&self.tree));
                }
                if let Some(state) = self.table_state_mut(parent) {
                    state.caption = Some(id);
                }
            }
            Behavior::TableColumnGroup(_) => {
                let replaceable = self.table_state(parent).is_some_and(|t| t.implicit_columns);
                if !replaceable {
                    return Err(duplicate(&self.tree));
                }
                if let Some(state) = self.table_state_mut(parent) {
                    state.columns = Some(id);
                    state.implicit_columns = false;
                }
            }
            Behavior::TableColumn { span, spec } => {
                let group = match self.tree.node(parent).behavior {
                    Behavior::TableColumnGroup(_) => Some(parent),
                    _ => self.table_state(parent).and_then(|t| t.columns),
                };
                if let Some(group) = group {
                    if let Behavior::TableColumnGroup(state) = &mut self.tree.node_mut(group).behavior {
                        state.specs.extend(std::iter::repeat(spec).take(span));
                    }
                }
            }
            Behavior::TableRowGroup { kind, .. } => {
                let slot_taken = self.table_state(parent).is_some_and(|t| match kind {
                    RowGroupKind::Header => t.header.is_some(),
                    RowGroupKind::Footer => t.footer.is_some(),
                    RowGroupKind::Body => false,
                });
                if slot_taken {
                    return Err(duplicate(&self.tree));
                }
                if let Some(state) = self.table_state_mut(parent) {
                    match kind {
                        RowGroupKind::Header => state.header = Some(id),
                        RowGroupKind::Footer => state.footer = Some(id),
                        RowGroupKind::Body => {}
                    }
                }
            }
            Behavior::TableRow => {
                let group = self.tree.node(parent).behavior.clone();
                if let Behavior::TableRowGroup { kind: RowGroupKind::Body, .. } = group {
                    if let Some(table) = self.tree.parent(parent) {
                        if let Some(state) = self.table_state_mut(table) {
                            state.rows.push(id);
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Fix-ups that need the box's children in place.
    fn finish(&mut self, id: NodeId, element: &Element) {
        if let Behavior::TableColumnGroup(state) = &mut self.tree.node_mut(id).behavior {
            if state.specs.is_empty() {
                let span = element
                    .attr("span")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .filter(|s| *s > 0);
                if let Some(span) = span {
                    state.specs = vec![ColumnSpec::Proportional(1.0); span];
                }
            }
        }
    }

    fn table_state(&self, id: NodeId) -> Option<&behavior::TableState> {
        match &self.tree.node(id).behavior {
            Behavior::Table(state) => Some(state),
            _ => None,
        }
    }

    fn table_state_mut(&mut self, id: NodeId) -> Option<&mut behavior::TableState> {
        match &mut self.tree.node_mut(id).behavior {
            Behavior::Table(state) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::selector::Element as _;
    use crate::markup;
    use crate::style::{Color, FontWeight};

    fn build_with(html: &str, css: &str) -> Result<BoxTree> {
        let cache = StyleCache::new();
        let doc = markup::parse(html)?;
        let mut sheet = Stylesheet::user_agent()?;
        sheet.add(css)?;
        build(&doc.root, &sheet, &cache)
    }

    fn first_with_tag(tree: &BoxTree, tag: &str) -> NodeId {
        (0..tree.len())
            .map(NodeId)
            .find(|id| tree.node(*id).tag == tag)
            .unwrap()
    }

    #[test]
    fn table_text_lists_every_section() {
        let tree = build_with(
            "<table><caption>cap</caption><tfoot><tr><td>foot</td></tr></tfoot>\
             <thead><tr><th>head</th></tr></thead><tr><td>body</td></tr></table>",
            "",
        )
        .unwrap();
        let table = first_with_tag(&tree, "table");
        assert_eq!(tree.text_content(table), vec!["cap", "head", "body", "foot"]);
    }

    #[test]
    fn positions_and_last() {
        let tree = build_with("<div><p>a</p><span>b</span><p>c</p></div>", "").unwrap();
        let div = first_with_tag(&tree, "div");
        let children: Vec<NodeId> = tree.node(div).child_nodes().collect();
        let p2 = tree.node(children[2]);
        assert_eq!(p2.position, 3);
        assert_eq!(p2.position_of_type, 2);
        assert!(p2.last);
        assert!(!tree.node(children[0]).last);
    }

    #[test]
    fn cascade_runs_with_final_positions() {
        let tree = build_with(
            "<table><tr><td>1</td></tr><tr><td>2</td></tr><tr><td>3</td></tr><tr><td>4</td></tr></table>",
            "tr:nth-child(even) { background-color: green }",
        )
        .unwrap();
        let table = first_with_tag(&tree, "table");
        let Behavior::Table(state) = &tree.node(table).behavior else {
            panic!("not a table");
        };
        let green: Vec<bool> = state
            .rows
            .iter()
            .map(|row| tree.node(*row).style.background_color.is_some())
            .collect();
        assert_eq!(green, vec![false, true, false, true]);
        let expected = "green".parse::<csscolorparser::Color>().unwrap().to_rgba8();
        assert_eq!(
            tree.node(state.rows[1]).style.background_color,
            Some(Color::from_rgba8(expected))
        );
    }

    #[test]
    fn cell_outside_row_is_a_structure_error() {
        let err = build_with("<div><th>x</th></div>", "").unwrap_err();
        assert!(matches!(err, QuireError::Structure { ref tag, .. } if tag == "th"));
    }

    #[test]
    fn inherited_and_user_agent_styles() {
        let tree = build_with("<p>a <b>bold</b></p>", "p { font-size: 20pt }").unwrap();
        let b = tree.node(first_with_tag(&tree, "b"));
        assert_eq!(b.style.font_size, 20.0);
        assert_eq!(b.style.font_weight, FontWeight::Bold);
    }

    #[test]
    fn table_slots_and_implicit_column_group() {
        let tree = build_with(
            "<table><caption>c</caption><thead><tr><th>h</th></tr></thead>\
             <tbody><tr><td>a</td></tr></tbody><tbody><tr><td>b</td></tr></tbody>\
             <tfoot><tr><td>f</td></tr></tfoot></table>",
            "",
        )
        .unwrap();
        let table = first_with_tag(&tree, "table");
        let Behavior::Table(state) = &tree.node(table).behavior else {
            panic!("not a table");
        };
        assert!(state.caption.is_some());
        assert!(state.columns.is_some());
        assert!(state.implicit_columns);
        assert!(state.header.is_some());
        assert!(state.footer.is_some());
        assert_eq!(state.rows.len(), 2);
    }

    #[test]
    fn explicit_columns_replace_the_implicit_group() {
        let tree = build_with(
            "<table><colgroup><col width='50'/><col width='2*' span='2'/></colgroup><tr><td>a</td></tr></table>",
            "",
        )
        .unwrap();
        let table = first_with_tag(&tree, "table");
        let Behavior::Table(state) = &tree.node(table).behavior else {
            panic!("not a table");
        };
        assert!(!state.implicit_columns);
        let Behavior::TableColumnGroup(group) = &tree.node(state.columns.unwrap()).behavior else {
            panic!("not a column group");
        };
        assert_eq!(
            group.specs,
            vec![
                ColumnSpec::Fixed(50.0),
                ColumnSpec::Proportional(2.0),
                ColumnSpec::Proportional(2.0)
            ]
        );
    }

    #[test]
    fn duplicate_header_is_an_error() {
        let err = build_with(
            "<table><thead><tr><td>a</td></tr></thead><thead><tr><td>b</td></tr></thead></table>",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, QuireError::DuplicateTableSection { .. }));
    }

    #[test]
    fn text_in_row_is_a_structure_error() {
        let err = build_with("<table><tr>oops<td>a</td></tr></table>", "").unwrap_err();
        assert!(matches!(err, QuireError::Structure { ref tag, ref parent } if tag == "#text" && parent == "tr"));
    }

    #[test]
    fn whitespace_in_table_is_dropped() {
        assert!(build_with("<table>\n  <tr>\n    <td>a</td>\n  </tr>\n</table>", "").is_ok());
    }

    #[test]
    fn display_none_keeps_position_but_no_content() {
        let tree = build_with("<div><p>a</p><p class='x'>b</p><p>c</p></div>", ".x { display: none }").unwrap();
        let hidden = (0..tree.len())
            .map(NodeId)
            .find(|id| tree.node(*id).classes.contains(&"x".to_string()))
            .unwrap();
        assert!(matches!(tree.node(hidden).behavior, Behavior::Hidden));
        assert!(tree.node(hidden).children.is_empty());
        assert_eq!(tree.element(hidden).position(), 2);
    }
}
