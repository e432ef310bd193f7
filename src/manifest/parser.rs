//! `imsmanifest.xml` parsing.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesRef, BytesStart, Event};

use super::{Manifest, ResourceRecord, TocNode};
use crate::error::{Error, Result};
use crate::util::{decode_text, extract_xml_encoding};

/// Ancestors of the `string` element holding the book title.
const BOOK_TITLE_PATH: &[&[u8]] = &[b"lom", b"general", b"title"];

/// Text element currently being collected.
enum Capture {
    /// `title` of the innermost open `item`.
    ItemTitle,
    /// `metadata/lom/general/title/string`.
    BookTitle,
}

/// Parse the manifest of an unpacked content package.
///
/// Only the first `organization` is used. Namespace prefixes are ignored, so
/// `imsmd:lom` and `lom` are treated alike.
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest> {
    let hint = extract_xml_encoding(bytes);
    let content = decode_text(strip_bom(bytes), hint);

    // Text is trimmed once collected; trimming per event would eat the
    // spaces around entity references.
    let mut reader = Reader::from_str(&content);

    let mut path: Vec<Vec<u8>> = Vec::new();
    // Open items of the organization; index 0 collects the top level.
    let mut items: Vec<TocNode> = Vec::new();
    let mut in_organization = false;
    let mut organization: Option<Vec<TocNode>> = None;
    let mut resources = Vec::new();
    let mut book_title: Option<String> = None;
    let mut capture: Option<Capture> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref()).to_vec();
                match local.as_slice() {
                    b"organization"
                        if parent_is(&path, b"organizations") && organization.is_none() =>
                    {
                        in_organization = true;
                        items.push(TocNode::default());
                    }
                    b"item" if in_organization => items.push(item_node(&e)?),
                    b"title" if in_organization && parent_is(&path, b"item") => {
                        capture = Some(Capture::ItemTitle);
                        buf_text.clear();
                    }
                    b"string"
                        if book_title.is_none() && path_ends_with(&path, BOOK_TITLE_PATH) =>
                    {
                        capture = Some(Capture::BookTitle);
                        buf_text.clear();
                    }
                    b"resource" if parent_is(&path, b"resources") => {
                        resources.push(resource_record(&e)?);
                    }
                    _ => {}
                }
                path.push(local);
            }
            Event::Empty(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"organization"
                        if parent_is(&path, b"organizations") && organization.is_none() =>
                    {
                        organization = Some(Vec::new());
                    }
                    b"item" if in_organization => {
                        let node = item_node(&e)?;
                        if let Some(parent) = items.last_mut() {
                            parent.children.push(node);
                        }
                    }
                    b"resource" if parent_is(&path, b"resources") => {
                        resources.push(resource_record(&e)?);
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if capture.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if capture.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if capture.is_some() {
                    resolve_reference(&e, &mut buf_text)?;
                }
            }
            Event::End(e) => {
                path.pop();
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"title" if matches!(capture, Some(Capture::ItemTitle)) => {
                        if let Some(item) = items.last_mut() {
                            item.title = Some(buf_text.trim().to_string());
                        }
                        capture = None;
                    }
                    b"string" if matches!(capture, Some(Capture::BookTitle)) => {
                        book_title = Some(buf_text.trim().to_string());
                        capture = None;
                    }
                    b"item" if in_organization && items.len() > 1 => {
                        if let Some(node) = items.pop()
                            && let Some(parent) = items.last_mut()
                        {
                            parent.children.push(node);
                        }
                    }
                    b"organization" if in_organization => {
                        in_organization = false;
                        organization = items.pop().map(|root| root.children);
                        items.clear();
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let toc = organization
        .ok_or_else(|| Error::MissingElement("organizations/organization".to_string()))?;
    let title = book_title
        .ok_or_else(|| Error::MissingElement("metadata/lom/general/title/string".to_string()))?;

    Ok(Manifest {
        title,
        toc,
        resources,
    })
}

fn item_node(e: &BytesStart<'_>) -> Result<TocNode> {
    let mut node = TocNode::default();
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == b"identifierref" {
            node.identifier_ref = Some(attr_value(&attr)?);
        }
    }
    Ok(node)
}

fn resource_record(e: &BytesStart<'_>) -> Result<ResourceRecord> {
    let mut record = ResourceRecord::default();
    for attr in e.attributes().flatten() {
        match local_name(attr.key.as_ref()) {
            b"identifier" => record.identifier = attr_value(&attr)?,
            b"type" => record.kind = attr_value(&attr)?,
            b"href" => record.href = Some(attr_value(&attr)?),
            _ => {}
        }
    }
    Ok(record)
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn parent_is(path: &[Vec<u8>], name: &[u8]) -> bool {
    path.last().is_some_and(|p| p.as_slice() == name)
}

fn path_ends_with(path: &[Vec<u8>], suffix: &[&[u8]]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a.as_slice() == *b)
}

/// Strip UTF-8 BOM if present.
fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "imsmd:lom" -> "lom").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Unescape an attribute value.
fn attr_value(attr: &Attribute<'_>) -> Result<String> {
    attr.unescape_value()
        .map(|value| value.into_owned())
        .map_err(|e| {
            Error::InvalidManifest(format!(
                "attribute {}: {e}",
                String::from_utf8_lossy(attr.key.as_ref())
            ))
        })
}

/// Append the text of a character or predefined entity reference.
fn resolve_reference(reference: &BytesRef<'_>, out: &mut String) -> Result<()> {
    if let Some(c) = reference.resolve_char_ref()? {
        out.push(c);
        return Ok(());
    }
    let name = String::from_utf8_lossy(reference.as_ref());
    let resolved = resolve_predefined_entity(&name)
        .ok_or_else(|| Error::InvalidManifest(format!("unrecognized entity &{name};")))?;
    out.push_str(resolved);
    Ok(())
}
