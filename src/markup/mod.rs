//! # Markup
//!
//! Reads HTML-ish markup into a plain element tree using `quick-xml` events.
//! Nesting must be well formed; the only leniency is for void elements
//! (`<br>`, `<col>`, `<img>` ...), which may appear without a close tag.
//!
//! [`repair`] then applies the table tree-construction fix-ups: stray rows
//! get an implicit `tbody`, stray cells an implicit `tr`.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{QuireError, Result};

/// Elements that never have content or a close tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Content>,
    /// Inserted by [`repair`] rather than read from the source.
    pub implicit: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Element {
            tag: tag.to_string(),
            ..Element::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }
}

/// A parsed document: top level content under a synthetic root, plus the
/// text of any `<style>` elements in document order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub root: Element,
    pub styles: Vec<String>,
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn attributes(e: &BytesStart) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    for attr in e.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.insert(key, value);
    }
    attrs
}

/// Parse markup into a [`Document`].
pub fn parse(markup: &str) -> Result<Document> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut stack: Vec<Element> = vec![Element::new("#root")];
    let mut styles = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| QuireError::Markup {
            position,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(e) => {
                let tag = tag_name(&e);
                let mut element = Element::new(&tag);
                element.attrs = attributes(&e);
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    push_content(&mut stack, Content::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(e) => {
                let mut element = Element::new(&tag_name(&e));
                element.attrs = attributes(&e);
                push_content(&mut stack, Content::Element(element));
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    continue;
                }
                let open = stack.last().map(|el| el.tag.as_str()).unwrap_or_default();
                if stack.len() < 2 || open != tag {
                    return Err(QuireError::Markup {
                        position,
                        message: format!("</{tag}> does not close <{open}>"),
                    });
                }
                let Some(element) = stack.pop() else { break };
                if element.tag == "style" {
                    styles.push(text_of(&element));
                }
                push_content(&mut stack, Content::Element(element));
            }
            Event::Text(e) => {
                let text = match e.unescape_with(html_entity) {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                push_content(&mut stack, Content::Text(text));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_content(&mut stack, Content::Text(text));
            }
            Event::Eof => break,
            // comments, doctype, processing instructions
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.last().map(|el| el.tag.clone()).unwrap_or_default();
        return Err(QuireError::Markup {
            position: reader.buffer_position() as u64,
            message: format!("<{open}> is never closed"),
        });
    }
    let mut root = stack.pop().unwrap_or_default();
    repair(&mut root);
    Ok(Document { root, styles })
}

/// The few named HTML entities that show up in report markup.
fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{a0}"),
        "copy" => Some("\u{a9}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "euro" => Some("\u{20ac}"),
        _ => None,
    }
}

fn push_content(stack: &mut [Element], content: Content) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(content);
    }
}

fn text_of(element: &Element) -> String {
    element
        .children
        .iter()
        .filter_map(|c| match c {
            Content::Text(text) => Some(text.as_str()),
            Content::Element(_) => None,
        })
        .collect()
}

/// Insert implicit `tbody` / `tr` wrappers, recursively.
pub fn repair(element: &mut Element) {
    match element.tag.as_str() {
        "table" => wrap_runs(element, &["tr", "td", "th"], "tbody"),
        "thead" | "tbody" | "tfoot" => wrap_runs(element, &["td", "th"], "tr"),
        _ => {}
    }
    for child in &mut element.children {
        if let Content::Element(child) = child {
            repair(child);
        }
    }
}

/// Move each run of `tags` children (and the text between them) into a new
/// implicit `wrapper` element.
fn wrap_runs(element: &mut Element, tags: &[&str], wrapper: &str) {
    let children = std::mem::take(&mut element.children);
    let mut open: Option<Element> = None;
    for child in children {
        let wraps = matches!(&child, Content::Element(e) if tags.contains(&e.tag.as_str()));
        let is_text = matches!(&child, Content::Text(_));
        if let Some(run) = open.as_mut() {
            if wraps || is_text {
                run.children.push(child);
                continue;
            }
        }
        if wraps {
            let mut run = Element::new(wrapper);
            run.implicit = true;
            run.children.push(child);
            open = Some(run);
            continue;
        }
        if let Some(run) = open.take() {
            element.children.push(Content::Element(run));
        }
        element.children.push(child);
    }
    if let Some(run) = open {
        element.children.push(Content::Element(run));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(element: &Element) -> Vec<String> {
        element.elements().map(|e| e.tag.clone()).collect()
    }

    #[test]
    fn nested_elements_and_text() {
        let doc = parse("<p>Hello <b>world</b>!</p>").unwrap();
        let p = doc.root.elements().next().unwrap();
        assert_eq!(p.tag, "p");
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.children[0], Content::Text("Hello ".to_string()));
    }

    #[test]
    fn void_elements_need_no_close_tag() {
        let doc = parse("<p>a<br>b<br/>c</p>").unwrap();
        let p = doc.root.elements().next().unwrap();
        assert_eq!(tags(p), vec!["br", "br"]);
    }

    #[test]
    fn attributes_are_lowercased_and_unescaped() {
        let doc = parse(r#"<td COLSPAN="2" title="a &amp; b"></td>"#).unwrap();
        let td = doc.root.elements().next().unwrap();
        assert_eq!(td.attr("colspan"), Some("2"));
        assert_eq!(td.attr("title"), Some("a & b"));
    }

    #[test]
    fn mismatched_close_is_fatal() {
        let err = parse("<div><p>text</div></p>").unwrap_err();
        assert!(matches!(err, QuireError::Markup { .. }));
    }

    #[test]
    fn unclosed_element_is_fatal() {
        assert!(parse("<div><p>text</p>").is_err());
    }

    #[test]
    fn style_elements_are_collected() {
        let doc = parse("<html><head><style>p { color: red }</style></head><body></body></html>").unwrap();
        assert_eq!(doc.styles, vec!["p { color: red }".to_string()]);
    }

    #[test]
    fn stray_rows_get_implicit_tbody() {
        let doc = parse("<table><thead><tr><td>h</td></tr></thead><tr><td>a</td></tr><tr><td>b</td></tr></table>")
            .unwrap();
        let table = doc.root.elements().next().unwrap();
        assert_eq!(tags(table), vec!["thead", "tbody"]);
        let tbody = table.elements().nth(1).unwrap();
        assert!(tbody.implicit);
        assert_eq!(tags(tbody), vec!["tr", "tr"]);
    }

    #[test]
    fn stray_cells_get_implicit_row() {
        let doc = parse("<table><td>a</td><td>b</td></table>").unwrap();
        let table = doc.root.elements().next().unwrap();
        let tbody = table.elements().next().unwrap();
        let tr = tbody.elements().next().unwrap();
        assert_eq!(tr.tag, "tr");
        assert_eq!(tags(tr), vec!["td", "td"]);
    }
}
