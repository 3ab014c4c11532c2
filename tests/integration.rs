//! Integration tests for the Quire layout pipeline.
//!
//! These tests exercise the full path from markup and CSS to drawn pages.
//! They verify:
//! - Lines, tables and rows measure to the expected sizes
//! - Content survives page splits without loss or duplication
//! - Table columns stay aligned and headers repeat across pages
//! - Selectors and the cascade style the right boxes
//! - PDF output is structurally valid

use quire::css::Stylesheet;
use quire::draw::RecordingSurface;
use quire::font::FontContext;
use quire::layout::{LayoutContext, PageConfig, PageSize, RenderOptions};
use quire::markup;
use quire::style::{Color, Edges, Style, StyleCache};
use quire::text::LineBox;
use quire::tree::{self, Behavior, BoxTree, NodeId};
use quire::QuireError;

// ─── Helpers ────────────────────────────────────────────────────

const MONO: &str = "p, td, th { font-family: courier; font-size: 10pt } p { margin: 0 } td, th { padding: 0 }";

fn build(html: &str, css: &str) -> (BoxTree, NodeId) {
    let cache = StyleCache::new();
    let mut sheet = Stylesheet::user_agent().unwrap();
    sheet.add(css).unwrap();
    let doc = markup::parse(html).unwrap();
    let tree = tree::build(&doc.root, &sheet, &cache).unwrap();
    let first = tree.node(tree.root()).child_nodes().next().unwrap();
    (tree, first)
}

fn table_rows(tree: &BoxTree, table: NodeId) -> Vec<NodeId> {
    match &tree.node(table).behavior {
        Behavior::Table(state) => state.rows.clone(),
        _ => panic!("not a table"),
    }
}

/// A 200pt square page with 20pt margins: 160pt of content in each direction.
fn small_page() -> RenderOptions {
    RenderOptions {
        page: PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 200.0,
            },
            margin: Edges::uniform(20.0),
        },
        ..RenderOptions::default()
    }
}

fn layout(html: &str, css: &str, options: &RenderOptions) -> (RecordingSurface, u32) {
    let mut surface = RecordingSurface::new();
    let pages = quire::layout_document(html, &[css], options, &mut surface).unwrap();
    (surface, pages)
}

fn all_text(surface: &RecordingSurface, pages: u32) -> Vec<String> {
    (1..=pages as usize)
        .flat_map(|page| {
            surface
                .page_text(page)
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.starts_with(b"%PDF-"), "missing PDF header");
    assert!(bytes.windows(5).any(|w| w == b"%%EOF"), "missing %%EOF marker");
    assert!(bytes.windows(4).any(|w| w == b"xref"), "missing xref table");
}

// ─── Measuring ──────────────────────────────────────────────────

#[test]
fn twenty_words_wrap_five_per_line() {
    let fonts = FontContext::new();
    let ctx = LayoutContext { fonts: &fonts, page_number: 1 };
    let html = format!("<p>{}</p>", vec!["abcd"; 20].join(" "));
    let (mut tree, p) = build(&html, MONO);
    // five 24pt words and four 6pt spaces
    tree.measure(p, 144.0, &ctx);
    let counts: Vec<usize> = tree
        .node(p)
        .lines
        .iter()
        .map(|row| match row {
            LineBox::Text(line) => line.words.len(),
            LineBox::Block(_) => 0,
        })
        .collect();
    assert_eq!(counts, vec![5, 5, 5, 5]);
}

#[test]
fn fixed_width_columns_give_the_table_size() {
    let fonts = FontContext::new();
    let ctx = LayoutContext { fonts: &fonts, page_number: 1 };
    let (mut tree, table) = build(
        r#"<table><colgroup><col width="50pt"/><col width="50pt"/></colgroup>
           <tr><td>left</td><td>right</td></tr></table>"#,
        "",
    );
    let (width, height) = tree.measure(table, 500.0, &ctx);
    assert_eq!(width, 100.0);
    assert_eq!(height, 14.0 + 2.0);
}

#[test]
fn row_below_one_line_is_returned_unchanged() {
    let fonts = FontContext::new();
    let ctx = LayoutContext { fonts: &fonts, page_number: 1 };
    let (mut tree, table) = build("<table><tr><td>only cell</td></tr></table>", "");
    tree.measure(table, 300.0, &ctx);
    let row = table_rows(&tree, table)[0];
    let (top, bottom) = tree.split(row, None, None, 10.0, &ctx).unwrap();
    assert_eq!((top, bottom), (None, Some(row)));
    assert_eq!(tree.node(row).children.len(), 1);
}

// ─── Cascade ────────────────────────────────────────────────────

#[test]
fn even_rows_are_colored() {
    let rows: String = (1..=4).map(|i| format!("<tr><td>r{i}</td></tr>")).collect();
    let html = format!("<table>{rows}</table>");
    let (surface, _) = layout(&html, "tr:nth-child(even) { background-color: #00ff00 }", &RenderOptions::default());
    let green = Color::rgb(0.0, 1.0, 0.0);
    let tops: Vec<f64> = surface.filled_with(green).iter().map(|r| r.1).collect();
    // 72pt top margin, 16pt rows: rows 2 and 4 start at 88 and 120
    assert_eq!(tops, vec![88.0, 120.0]);
}

#[test]
fn cascade_is_idempotent_and_interned() {
    let html = "<div><p class=\"a\">x <b>y</b></p><table><tr><td>1</td><td>2</td></tr></table></div>";
    let cache = StyleCache::new();
    let mut sheet = Stylesheet::user_agent().unwrap();
    sheet.add(".a { color: #336699 } td + td { font-weight: bold }").unwrap();
    let doc = markup::parse(html).unwrap();
    let first = tree::build(&doc.root, &sheet, &cache).unwrap();
    let second = tree::build(&doc.root, &sheet, &cache).unwrap();
    assert_eq!(first.len(), second.len());
    for i in 0..first.len() {
        let (a, b) = (&first.node(NodeId(i)).style, &second.node(NodeId(i)).style);
        assert!(Style::ptr_eq(a, b), "box {i} got a different style");
    }
}

// ─── Pagination ─────────────────────────────────────────────────

#[test]
fn split_content_is_complete_across_pages() {
    let paragraphs: String = (0..25)
        .map(|i| format!("<p>para{i} alpha beta gamma delta epsilon</p>"))
        .collect();
    let rows: String = (0..20).map(|i| format!("<tr><td>cell{i}</td><td>x{i}</td></tr>")).collect();
    let html = format!("<div>{paragraphs}<table>{rows}</table></div><p>end</p>");

    let mut expected = Vec::new();
    for i in 0..25 {
        expected.push(format!("para{i}"));
        expected.extend(["alpha", "beta", "gamma", "delta", "epsilon"].map(String::from));
    }
    for i in 0..20 {
        expected.push(format!("cell{i}"));
        expected.push(format!("x{i}"));
    }
    expected.push("end".to_string());

    let (surface, pages) = layout(&html, MONO, &small_page());
    assert!(pages > 3);
    assert_eq!(all_text(&surface, pages), expected);
}

#[test]
fn split_rows_keep_columns_and_headers_repeat() {
    let lines: Vec<String> = (1..=20).map(|i| format!("l{i}")).collect();
    let html = format!(
        r#"<table><thead><tr><th>a</th><th>b</th><th>c</th></tr></thead>
           <tr><td colspan="2">{}</td><td>side</td></tr></table>"#,
        lines.join("<br/>")
    );
    let css = format!("{MONO} td {{ vertical-align: top }}");
    let (surface, pages) = layout(&html, &css, &small_page());
    assert_eq!(pages, 2);

    let placed = surface.placed_text();
    let find = |text: &str| placed.iter().find(|t| t.text == text).unwrap().clone();
    // 12pt header, then twelve 12pt lines fit in the remaining 148pt
    assert_eq!(find("l12").page, 1);
    assert_eq!(find("l13").page, 2);
    assert_eq!(find("l13").x, find("l1").x);
    assert_eq!(find("side").page, 1);
    assert_eq!(placed.iter().filter(|t| t.text == "b").count(), 2);
    // the continued lines start right under the repeated header
    assert_eq!(find("l13").y, find("l1").y);
}

#[test]
fn bottom_aligned_cell_moves_down_by_the_surplus() {
    let html = "<table><tr><td>a<br/>b<br/>c<br/>d</td><td class=\"x\">low</td></tr></table>";
    let y_of = |align: &str| {
        let css = format!("{MONO} td {{ vertical-align: top }} .x {{ vertical-align: {align} }}");
        let (surface, _) = layout(html, &css, &RenderOptions::default());
        surface.placed_text().into_iter().find(|t| t.text == "low").unwrap().y
    };
    // the neighbour is three 12pt lines taller
    assert_eq!(y_of("bottom") - y_of("top"), 36.0);
}

#[test]
fn page_break_before_and_bottom_right_content() {
    let html = "<p>first</p><p class=\"next\">second</p>";
    let css = format!(
        r#"{MONO} .next {{ page-break-before: always }} @page {{ @bottom-right {{ content: "Page " counter(page) }} }}"#
    );
    let (surface, pages) = layout(html, &css, &small_page());
    assert_eq!(pages, 2);
    assert_eq!(surface.page_text(1), "first Page 1");
    assert_eq!(surface.page_text(2), "second Page 2");
}

#[test]
fn style_elements_apply_before_caller_css() {
    let html = "<html><head><style>p { font-size: 20pt }</style></head><body><p>x</p></body></html>";
    let (surface, _) = layout(html, "", &RenderOptions::default());
    let sizes: Vec<f64> = surface
        .ops
        .iter()
        .filter_map(|op| match op {
            quire::draw::DrawOp::SetFont { size, .. } => Some(*size),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![20.0]);

    let (surface, _) = layout(html, "p { font-size: 8pt }", &RenderOptions::default());
    assert!(surface
        .ops
        .iter()
        .any(|op| matches!(op, quire::draw::DrawOp::SetFont { size, .. } if *size == 8.0)));
}

// ─── Errors ─────────────────────────────────────────────────────

#[test]
fn text_directly_in_a_row_is_a_structure_error() {
    let mut surface = RecordingSurface::new();
    let err = quire::layout_document(
        "<table><tr>stray<td>a</td></tr></table>",
        &[],
        &RenderOptions::default(),
        &mut surface,
    )
    .unwrap_err();
    assert!(matches!(err, QuireError::Structure { .. }));
    assert_eq!(surface.page_count(), 0);
}

#[test]
fn unsupported_selector_fails_before_layout() {
    let err = quire::render_html("<p>x</p>", &["p:hover { color: red }"], &RenderOptions::default()).unwrap_err();
    assert!(matches!(err, QuireError::UnsupportedSelector(_)));
}

#[test]
fn unknown_unit_fails_before_layout() {
    let err = quire::render_html("<p>x</p>", &["p { margin: 3furlong }"], &RenderOptions::default()).unwrap_err();
    assert!(matches!(err, QuireError::UnknownUnit(_)));
}

// ─── PDF ────────────────────────────────────────────────────────

#[test]
fn renders_a_valid_multi_page_pdf() {
    let paragraphs: String = (0..80).map(|i| format!("<p>Paragraph number {i}</p>")).collect();
    let bytes = quire::render_html(&paragraphs, &[], &RenderOptions::default()).unwrap();
    assert_valid_pdf(&bytes);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/BaseFont /Helvetica"));
    // 80 paragraphs of 14pt plus 12pt gaps do not fit on one A4 page
    assert!(!text.contains("/Count 1 "));
}

#[test]
fn options_json_drives_the_page_size() {
    let options = RenderOptions::from_json(r#"{ "page": { "size": "Letter", "margin": { "top": 36, "right": 36, "bottom": 36, "left": 36 } } }"#).unwrap();
    let bytes = quire::render_html("<p>hello</p>", &[], &options).unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/MediaBox [0 0 612.00 792.00]"));
}
