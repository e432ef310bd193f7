//! Jade generation from parsed HTML.
//!
//! LFA books are written in Jade, an indentation-based HTML template
//! language. This module renders the `<body>` of a parsed page as Jade text:
//!
//! - [`escape`]: pure escaping helpers for text and attribute values
//! - [`render`]: DOM → Jade rendering
//!
//! ## Output shape
//!
//! - Elements become `tag#id.class(attr="value")` lines; a `div` with an id
//!   or class is written as just the shorthand.
//! - An element whose only child is text is written on one line (`p Hello`).
//! - Other text becomes piped lines (`| text`), with whitespace collapsed.
//! - `pre`, `textarea`, `script` and `style` become dot blocks (`pre.`) with
//!   their text content on indented lines.
//! - Text is HTML-escaped and `#{`, `!{`, `#[` are escaped so nothing from a
//!   page is interpolated.

mod escape;
mod render;

pub use escape::{
    collapse_whitespace, escape_interpolation, escape_text, is_plain_attribute_name,
    is_shorthand_name, quote_attribute,
};
pub use render::{RenderContext, convert_html, render_body};
