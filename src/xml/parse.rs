//! Text-to-document parser built on quick-xml's pull API.
//!
//! Only element structure and attributes are meaningful to the wire
//! format; text nodes, comments, and processing instructions are skipped.
//! Attribute values are unescaped here so the rest of the crate only ever
//! sees raw text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::doc::{Document, NodeId};
use crate::error::{Result, SaveError};

fn open_element(doc: &mut Document, stack: &[NodeId], start: &BytesStart<'_>) -> Result<NodeId> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let node = match stack.last() {
        Some(&parent) => doc.append_child(parent, &name),
        None if doc.root().is_none() => doc.create_root(&name),
        // A second top-level element is not a document we produce.
        None => return Err(SaveError::InvalidRoot),
    };
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        doc.set_attr(node, &key, &value);
    }
    Ok(node)
}

/// Parse a complete XML document from `bytes`.
pub(crate) fn parse_document(bytes: &[u8]) -> Result<Document> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let node = open_element(&mut doc, &stack, &start)?;
                stack.push(node);
            }
            Event::Empty(start) => {
                open_element(&mut doc, &stack, &start)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if doc.root().is_none() {
        return Err(SaveError::InvalidRoot);
    }
    Ok(doc)
}
