//! DOM → Jade rendering.
//!
//! Pure string accumulation over a parsed [`Document`]; writing files is the
//! page pipeline's job.

use crate::dom::{Document, NodeData, NodeId};

use super::escape::{
    collapse_whitespace, escape_interpolation, escape_text, is_plain_attribute_name,
    is_shorthand_name, quote_attribute,
};

/// Spaces per nesting level.
const INDENT: &str = "  ";

/// Elements without content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text is emitted verbatim as a `tag.` block.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose whitespace is significant.
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Phrasing elements; whitespace between two of them is kept.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "br", "button", "cite", "code", "data", "dfn", "em",
    "font", "i", "img", "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small",
    "span", "strike", "strong", "sub", "sup", "textarea", "time", "tt", "u", "var",
];

/// Render the children of `<body>` as Jade.
///
/// Returns an empty string for documents without a body or with an empty one.
pub fn render_body(doc: &Document) -> String {
    match doc.body() {
        Some(body) => RenderContext::new(doc).render(body),
        None => String::new(),
    }
}

/// Parse an HTML fragment and render it as Jade without a surrounding body.
pub fn convert_html(html: &str) -> String {
    render_body(&crate::dom::parse_html(html))
}

/// Rendering state (pure string accumulation, no I/O).
pub struct RenderContext<'a> {
    doc: &'a Document,
    output: String,
}

impl<'a> RenderContext<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            output: String::new(),
        }
    }

    /// Render the children of `root`, consuming the context.
    pub fn render(mut self, root: NodeId) -> String {
        self.walk_children(root, 0);
        self.output
    }

    fn walk_children(&mut self, parent: NodeId, depth: usize) {
        let children: Vec<NodeId> = self.doc.children(parent).collect();
        for (idx, &child) in children.iter().enumerate() {
            let prev = idx.checked_sub(1).map(|i| children[i]);
            let next = children.get(idx + 1).copied();
            self.walk_node(child, prev, next, depth);
        }
    }

    fn walk_node(&mut self, id: NodeId, prev: Option<NodeId>, next: Option<NodeId>, depth: usize) {
        let Some(node) = self.doc.get(id) else {
            return;
        };

        match &node.data {
            NodeData::Text(text) => {
                let collapsed = collapse_whitespace(text);
                if collapsed.trim().is_empty() {
                    // Whitespace only matters between two inline siblings.
                    if !collapsed.is_empty() && self.is_inline(prev) && self.is_inline(next) {
                        self.write_line(depth, "|  ");
                    }
                    return;
                }
                // `| ` eats one space, so a kept leading space survives as `|  x`.
                let text = self.trim_for_siblings(&collapsed, prev, next);
                self.write_line(depth, &format!("| {}", escape_text(&text)));
            }
            NodeData::Comment(text) => {
                let collapsed = collapse_whitespace(text);
                let collapsed = collapsed.trim();
                if !collapsed.is_empty() {
                    self.write_line(depth, &format!("// {collapsed}"));
                }
            }
            NodeData::Element { .. } => self.walk_element(id, depth),
            NodeData::Document => self.walk_children(id, depth),
        }
    }

    fn walk_element(&mut self, id: NodeId, depth: usize) {
        let Some(name) = self.doc.element_name(id) else {
            return;
        };
        let name = name.as_ref();
        let head = self.tag_head(id);

        if VOID_ELEMENTS.contains(&name) {
            self.write_line(depth, &head);
            return;
        }

        if PREFORMATTED_ELEMENTS.contains(&name) || RAW_TEXT_ELEMENTS.contains(&name) {
            let text = self.doc.collect_text(id);
            let raw = RAW_TEXT_ELEMENTS.contains(&name);
            let text = if raw {
                escape_interpolation(&text)
            } else {
                escape_text(&text)
            };
            self.write_text_block(depth, &head, &text, raw);
            return;
        }

        // `p Hello` when the only child is short text.
        let children: Vec<NodeId> = self.doc.children(id).collect();
        if let [only] = children.as_slice()
            && let Some(text) = self.doc.text_content(*only)
        {
            let collapsed = collapse_whitespace(text);
            let collapsed = collapsed.trim();
            if collapsed.is_empty() {
                self.write_line(depth, &head);
            } else {
                self.write_line(depth, &format!("{head} {}", escape_text(collapsed)));
            }
            return;
        }

        self.write_line(depth, &head);
        self.walk_children(id, depth + 1);
    }

    /// Build `tag#id.class(attr="value")`, dropping an implied `div`.
    fn tag_head(&self, id: NodeId) -> String {
        let name = self
            .doc
            .element_name(id)
            .map(|n| n.as_ref())
            .unwrap_or("div");

        let mut shorthand = String::new();
        let mut attrs = Vec::new();

        for attr in self.doc.attrs(id) {
            let attr_name = attr.name.local.as_ref();
            match attr_name {
                "id" if is_shorthand_name(&attr.value) => {
                    shorthand.push('#');
                    shorthand.push_str(&attr.value);
                }
                "class"
                    if !attr.value.trim().is_empty()
                        && attr.value.split_whitespace().all(is_shorthand_name) =>
                {
                    for class in attr.value.split_whitespace() {
                        shorthand.push('.');
                        shorthand.push_str(class);
                    }
                }
                _ => {
                    let key = if is_plain_attribute_name(attr_name) {
                        attr_name.to_string()
                    } else {
                        format!("'{attr_name}'")
                    };
                    attrs.push(format!("{key}={}", quote_attribute(&attr.value)));
                }
            }
        }

        let mut head = String::new();
        if name != "div" || shorthand.is_empty() {
            head.push_str(name);
        }
        head.push_str(&shorthand);
        if !attrs.is_empty() {
            head.push('(');
            head.push_str(&attrs.join(", "));
            head.push(')');
        }
        head
    }

    /// Drop leading/trailing spaces that face a block sibling or an edge.
    fn trim_for_siblings(&self, text: &str, prev: Option<NodeId>, next: Option<NodeId>) -> String {
        let mut text = text;
        if !self.is_inline(prev) {
            text = text.trim_start();
        }
        if !self.is_inline(next) {
            text = text.trim_end();
        }
        text.to_string()
    }

    fn is_inline(&self, id: Option<NodeId>) -> bool {
        let Some(id) = id else {
            return false;
        };
        match self.doc.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => !text.trim().is_empty(),
            Some(NodeData::Element { name, .. }) => INLINE_ELEMENTS.contains(&name.local.as_ref()),
            _ => false,
        }
    }

    /// Write a `tag.` block.
    ///
    /// Jade takes the block's indentation from its first non-blank line and
    /// ends the block at the first line indented less. The first line's own
    /// leading whitespace is therefore dropped for raw text and written as
    /// character references for preformatted text.
    fn write_text_block(&mut self, depth: usize, head: &str, text: &str, raw: bool) {
        self.write_line(depth, &format!("{head}."));
        let mut first = true;
        for line in text.lines() {
            if line.trim().is_empty() {
                self.output.push('\n');
                continue;
            }
            if first && line.starts_with(char::is_whitespace) {
                let content = line.trim_start();
                let line = if raw {
                    content.to_string()
                } else {
                    let indent = &line[..line.len() - content.len()];
                    let mut encoded: String = indent
                        .chars()
                        .map(|c| format!("&#{};", u32::from(c)))
                        .collect();
                    encoded.push_str(content);
                    encoded
                };
                self.write_line(depth + 1, &line);
            } else {
                self.write_line(depth + 1, line);
            }
            first = false;
        }
    }

    fn write_line(&mut self, depth: usize, line: &str) {
        for _ in 0..depth {
            self.output.push_str(INDENT);
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}
