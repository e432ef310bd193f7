//! HTML page parsing.
//!
//! Pages are parsed with html5ever into an arena-backed [`Document`], which
//! the asset localizer scans for images and the Jade renderer walks.
//!
//! ```
//! use scorm2lfa::dom::parse_html;
//!
//! let doc = parse_html("<p>Hello <img src='a.png'></p>");
//! let body = doc.body().unwrap();
//! assert_eq!(doc.elements_by_tag(body, "img").len(), 1);
//! ```

mod arena;
mod tree_sink;

pub use arena::{Attribute, Children, Document, Node, NodeData, NodeId};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use crate::util::{decode_text, extract_meta_charset, extract_xml_encoding};
use tree_sink::ArenaSink;

/// Parse an HTML document.
///
/// html5ever always produces `html`, `head` and `body` elements, so a bare
/// fragment such as `<pre>...</pre>` parses into a complete document too.
pub fn parse_html(html: &str) -> Document {
    let sink = ArenaSink::new();
    parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_document()
}

/// Parse HTML bytes of unknown encoding.
///
/// UTF-8 is tried first; otherwise the charset declared in a `<meta>` tag or
/// XML declaration is used, falling back to Windows-1252.
pub fn parse_html_bytes(bytes: &[u8]) -> Document {
    let hint = extract_meta_charset(bytes).or_else(|| extract_xml_encoding(bytes));
    parse_html(&decode_text(bytes, hint))
}
