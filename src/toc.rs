//! Table-of-contents crawling.
//!
//! Flattens the manifest's ToC tree into [`TextFileEntry`] values in
//! depth-first pre-order. Every entry gets a [`ChapterCode`] such as
//! `002-001`, which doubles as the sort key and the output path
//! (`002/001.jade`).
//!
//! A node with children is emitted under `<code>-000`, its "section landing"
//! entry, so its own content never collides with the directory holding its
//! children.

use std::fmt;
use std::path::PathBuf;

use log::warn;

use crate::manifest::{ResourceMap, TocNode};

/// Extension of emitted text files.
pub const TEXT_EXTENSION: &str = "jade";

/// Sibling index reserved for a section's own content.
const LANDING_INDEX: usize = 0;

/// Largest sibling index that still pads to three digits.
const MAX_PADDED_INDEX: usize = 999;

/// Hierarchical, dash-delimited position of a ToC node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterCode(String);

impl ChapterCode {
    /// Code of the `index`-th (1-based) top-level node.
    pub fn root(index: usize) -> Self {
        Self(pad_index(index))
    }

    /// Code of the `index`-th (1-based) child below this code.
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}-{}", self.0, pad_index(index)))
    }

    /// Code of a branch node's own content.
    pub fn landing(&self) -> Self {
        self.child(LANDING_INDEX)
    }

    /// Code for a node at this position, given whether it has children.
    pub fn for_node(&self, has_children: bool) -> Self {
        if has_children {
            self.landing()
        } else {
            self.clone()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Nesting depth, 1 for top-level leaves.
    pub fn depth(&self) -> usize {
        self.0.split('-').count()
    }

    /// Whether every segment is three digits wide.
    ///
    /// Codes built from more than 999 siblings are still unique, but their
    /// lexicographic order no longer matches document order.
    pub fn is_canonical(&self) -> bool {
        self.0.split('-').all(|segment| segment.len() == 3)
    }

    /// Relative output path, e.g. `002/001.jade`.
    pub fn output_path(&self) -> PathBuf {
        let mut path: PathBuf = self.0.split('-').collect();
        path.set_extension(TEXT_EXTENSION);
        path
    }
}

impl fmt::Display for ChapterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn pad_index(index: usize) -> String {
    format!("{index:03}")
}

/// Where an entry's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// Fetch this URL (absolute, or relative to the package directory).
    Url(String),
    /// The node has no `identifierref`; it is a pure navigation node.
    NoContent,
    /// The `identifierref` does not name a weblink resource.
    Unknown,
}

impl PageSource {
    /// Resolve a node's `identifierref` against the resource map.
    pub fn resolve(identifier_ref: Option<&str>, resources: &ResourceMap) -> Self {
        match identifier_ref {
            None => PageSource::NoContent,
            Some(id) => match resources.get(id) {
                Some(url) => PageSource::Url(url.to_string()),
                None => PageSource::Unknown,
            },
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            PageSource::Url(url) => Some(url),
            _ => None,
        }
    }
}

/// One output text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFileEntry {
    pub title: Option<String>,
    pub chapter_code: ChapterCode,
    /// Path relative to the `text/` directory.
    pub output_path: PathBuf,
    pub source: PageSource,
}

/// Flatten the ToC tree into entries in document order.
pub fn crawl_toc(toc: &[TocNode], resources: &ResourceMap) -> Vec<TextFileEntry> {
    let mut entries = Vec::new();
    warn_if_wide(toc.len(), "top level");
    for (idx, node) in toc.iter().enumerate() {
        crawl_node(&mut entries, resources, ChapterCode::root(idx + 1), node);
    }
    entries
}

fn crawl_node(
    entries: &mut Vec<TextFileEntry>,
    resources: &ResourceMap,
    prefix: ChapterCode,
    node: &TocNode,
) {
    let chapter_code = prefix.for_node(!node.children.is_empty());
    entries.push(TextFileEntry {
        title: node.title.clone(),
        output_path: chapter_code.output_path(),
        chapter_code,
        source: PageSource::resolve(node.identifier_ref.as_deref(), resources),
    });

    warn_if_wide(node.children.len(), prefix.as_str());
    for (idx, child) in node.children.iter().enumerate() {
        crawl_node(entries, resources, prefix.child(idx + 1), child);
    }
}

fn warn_if_wide(siblings: usize, level: &str) {
    if siblings > MAX_PADDED_INDEX {
        warn!(
            "{siblings} ToC entries on one level ({level}); chapter codes past {MAX_PADDED_INDEX} \
             are not zero-padded and may sort out of order"
        );
    }
}
