//! # Quire
//!
//! A paginating HTML/CSS box layout engine.
//!
//! Quire lays out a document directly onto fixed-size pages. Every box knows
//! how to measure itself at a width, whether it fits in the height left on
//! the current page, and how to split itself into a part that fits and a
//! part that continues on the next page. Nothing is laid out on an endless
//! canvas and cut afterwards, so table rows stay aligned across page breaks
//! and table headers repeat on every page.
//!
//! ## Architecture
//!
//! ```text
//! markup + CSS
//!       ↓
//!   [markup]   quick-xml events -> element tree (implicit tbody/tr repair)
//!   [css]      cssparser -> selector/declaration rules, user agent sheet
//!       ↓
//!   [tree]     cascade, behavior selection -> arena BoxTree
//!       ↓
//!   [layout]   measure / fits / split / draw, driven by the page loop
//!       ↓
//!   [draw]     Surface drawing contract
//!   [pdf]      Surface -> PDF bytes
//! ```

pub mod css;
pub mod draw;
pub mod error;
pub mod font;
pub mod layout;
pub mod markup;
pub mod pdf;
pub mod style;
pub mod text;
pub mod tree;

use css::Stylesheet;
use draw::Surface;
use error::Result;
use font::FontContext;
use layout::RenderOptions;
use pdf::PdfWriter;
use style::StyleCache;

pub use error::QuireError;

/// Render `html` with the extra stylesheets in `css` to PDF bytes.
///
/// Stylesheets apply in order: the user agent sheet (unless disabled), then
/// every `<style>` element of the document, then `css`.
pub fn render_html(html: &str, css: &[&str], options: &RenderOptions) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new();
    let pages = layout_document(html, css, options, &mut writer)?;
    log::debug!("Rendered {} pages", pages);
    Ok(writer.finish())
}

/// Lay out `html` onto pages drawn to `surface`. Returns the page count.
pub fn layout_document(
    html: &str,
    css: &[&str],
    options: &RenderOptions,
    surface: &mut dyn Surface,
) -> Result<u32> {
    let document = markup::parse(html)?;
    let mut sheet = if options.user_agent_stylesheet {
        Stylesheet::user_agent()?
    } else {
        Stylesheet::default()
    };
    for source in &document.styles {
        sheet.add(source)?;
    }
    for source in css {
        sheet.add(source)?;
    }

    let cache = StyleCache::new();
    let mut tree = tree::build(&document.root, &sheet, &cache)?;
    log::debug!("Built {} boxes, {} distinct styles", tree.len(), cache.len());
    let fonts = FontContext::new();
    layout::paginate(&mut tree, &sheet, &cache, &options.page, &fonts, surface)
}
