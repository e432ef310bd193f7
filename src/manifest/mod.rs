//! IMS content package manifest (`imsmanifest.xml`).
//!
//! [`parse_manifest`] turns the raw manifest bytes into a typed [`Manifest`];
//! [`ResourceMap`] is the identifier → URL lookup the ToC crawler resolves
//! `identifierref` attributes against.

mod parser;

use std::collections::HashMap;

pub use parser::parse_manifest;

/// File name of the manifest inside an unpacked content package.
pub const MANIFEST_FILE: &str = "imsmanifest.xml";

/// Resource type of entries that point at a web page.
pub const WEBLINK_TYPE: &str = "weblink";

/// Parsed manifest data needed for a migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// First `metadata/lom/general/title/string` text.
    pub title: String,
    /// Top-level items of the first organization.
    pub toc: Vec<TocNode>,
    /// Every `resources/resource` record, in document order.
    pub resources: Vec<ResourceRecord>,
}

/// A table-of-contents `item` as declared in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocNode {
    pub title: Option<String>,
    pub identifier_ref: Option<String>,
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// Create a leaf node pointing at a resource.
    pub fn new(title: impl Into<String>, identifier_ref: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            identifier_ref: Some(identifier_ref.into()),
            children: Vec::new(),
        }
    }

    /// Create a section node without its own resource.
    pub fn section(title: impl Into<String>, children: Vec<TocNode>) -> Self {
        Self {
            title: Some(title.into()),
            identifier_ref: None,
            children,
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TocNode::count).sum::<usize>()
    }
}

/// A `resource` element of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
    pub identifier: String,
    pub kind: String,
    pub href: Option<String>,
}

/// Maps resource identifiers to the URL of weblink resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    urls: HashMap<String, String>,
}

impl ResourceMap {
    /// Build the lookup from the manifest's resource records.
    ///
    /// Only `weblink` resources are kept; every other type is invisible to the
    /// crawler. Later records with the same identifier win.
    pub fn from_records(records: &[ResourceRecord]) -> Self {
        let mut urls = HashMap::new();
        for record in records {
            if record.kind != WEBLINK_TYPE {
                continue;
            }
            if let Some(href) = &record.href
                && !record.identifier.is_empty()
            {
                urls.insert(record.identifier.clone(), href.clone());
            }
        }
        Self { urls }
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.urls.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
