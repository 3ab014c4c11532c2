//! # Box Tree
//!
//! An arena of boxes. Children are owned through their parent's child list;
//! the `parent` field is a plain index back-reference, so there are no
//! reference cycles and split clones are cheap to add.
//!
//! Each box carries its computed [`Style`], its [`Behavior`], the sibling
//! counters used by structural selectors and whatever layout state the last
//! `measure` call left behind.

pub mod behavior;
pub mod builder;

use std::collections::BTreeMap;

pub use behavior::{Behavior, ColumnSpec, RowGroupKind, TableState};
pub use builder::build;

use crate::css::selector::Element;
use crate::style::Style;
use crate::text::{FlowItem, LineBox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One entry in a box's child list.
#[derive(Debug, Clone)]
pub enum Child {
    Text(String),
    Node(NodeId),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub parent: Option<NodeId>,
    pub style: Style,
    pub behavior: Behavior,
    pub children: Vec<Child>,

    /// 1-based position among element siblings.
    pub position: usize,
    /// 1-based position among element siblings sharing this tag.
    pub position_of_type: usize,
    pub last: bool,

    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Inline content as words, built on first measure or handed over by a split.
    pub flow: Option<Vec<FlowItem>>,
    pub lines: Vec<LineBox>,
}

impl Node {
    pub fn new(tag: &str, parent: Option<NodeId>, style: Style) -> Self {
        Node {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            parent,
            style,
            behavior: Behavior::Block,
            children: Vec::new(),
            position: 1,
            position_of_type: 1,
            last: false,
            width: None,
            height: None,
            flow: None,
            lines: Vec::new(),
        }
    }

    /// Element children, in order.
    pub fn child_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().filter_map(|child| match child {
            Child::Node(id) => Some(*id),
            Child::Text(_) => None,
        })
    }
}

/// The arena holding every box of a document, split clones included.
#[derive(Debug, Clone)]
pub struct BoxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl BoxTree {
    pub fn new(root: Node) -> Self {
        BoxTree {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Add a detached node to the arena.
    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Add a node and append it to `parent`'s children.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = self.add(node);
        self.nodes[parent.0].children.push(Child::Node(id));
        id
    }

    /// A twin of `id` under `parent`: same tag, attributes, style, sibling
    /// counters and behavior configuration, but no children and no layout
    /// state. Used by split to build the two halves.
    pub fn clone_node(&mut self, id: NodeId, parent: Option<NodeId>) -> NodeId {
        let source = &self.nodes[id.0];
        let mut twin = Node::new(&source.tag, parent.or(source.parent), source.style.clone());
        twin.id = source.id.clone();
        twin.classes = source.classes.clone();
        twin.attrs = source.attrs.clone();
        twin.behavior = source.behavior.fresh_copy();
        twin.position = source.position;
        twin.position_of_type = source.position_of_type;
        twin.last = source.last;
        self.add(twin)
    }

    /// Point `child` at a new parent (split halves adopt their content).
    pub fn reparent(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// The closest ancestor with a table behavior.
    pub fn table_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if matches!(self.node(ancestor).behavior, Behavior::Table(_)) {
                return Some(ancestor);
            }
            current = self.parent(ancestor);
        }
        None
    }

    /// The `body` box if the document has one, otherwise the root.
    pub fn body(&self) -> NodeId {
        self.find_tag(self.root, "body").unwrap_or(self.root)
    }

    fn find_tag(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        if self.node(from).tag == tag {
            return Some(from);
        }
        self.node(from)
            .child_nodes()
            .find_map(|child| self.find_tag(child, tag))
    }

    /// A selector-matching view of `id`.
    pub fn element(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Every node's text content, depth first. Handy for checking that split
    /// halves together hold exactly the original content. Tables list their
    /// caption, header, body rows and footer in that order.
    pub fn text_content(&self, id: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut Vec<String>) {
        let node = self.node(id);
        if let Some(flow) = &node.flow {
            for item in flow {
                match item {
                    FlowItem::Word(word) => out.push(word.text()),
                    FlowItem::Break(_) => {}
                    FlowItem::Block(child) => self.collect_text(*child, out),
                }
            }
            return;
        }
        match &node.behavior {
            Behavior::Table(state) => {
                let sections = state.caption.iter().chain(&state.header);
                for section in sections.chain(&state.rows).chain(&state.footer) {
                    self.collect_text(*section, out);
                }
                return;
            }
            Behavior::Hidden => return,
            _ => {}
        }
        for child in &node.children {
            match child {
                Child::Text(text) => out.extend(text.split_whitespace().map(str::to_string)),
                Child::Node(child) => self.collect_text(*child, out),
            }
        }
    }
}

/// A borrowed handle to one box, implementing selector matching.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a BoxTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &'a Node {
        self.tree.node(self.id)
    }
}

impl<'a> Element for NodeRef<'a> {
    fn tag(&self) -> &str {
        &self.node().tag
    }

    fn id(&self) -> Option<&str> {
        self.node().id.as_deref()
    }

    fn has_class(&self, name: &str) -> bool {
        self.node().classes.iter().any(|c| c == name)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.node().attrs.contains_key(name)
    }

    fn position(&self) -> usize {
        self.node().position
    }

    fn position_of_type(&self) -> usize {
        self.node().position_of_type
    }

    fn is_last(&self) -> bool {
        self.node().last
    }

    fn parent(&self) -> Option<Self> {
        // the synthetic document root is not an element
        self.node()
            .parent
            .filter(|parent| *parent != self.tree.root)
            .map(|id| NodeRef { tree: self.tree, id })
    }

    fn previous_sibling(&self) -> Option<Self> {
        let parent = self.tree.node(self.node().parent?);
        let mut previous = None;
        for child in parent.child_nodes() {
            if child == self.id {
                return previous.map(|id| NodeRef { tree: self.tree, id });
            }
            previous = Some(child);
        }
        None
    }
}
