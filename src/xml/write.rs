//! Document-to-text serializer.
//!
//! Output is deterministic: UTF-8 prolog, two-space indentation, elements
//! in document order, attributes in insertion order. The first attribute
//! sits on the element's own line and the rest align under it, which keeps
//! wide `data` attributes diffable. Empty elements self-close.

use std::borrow::Cow;
use std::io::Write;

use crate::doc::{Document, NodeId};
use crate::error::{Result, SaveError};

const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Escape attribute text. The five markup characters become entities, and
/// so do the whitespace characters an XML parser would otherwise normalize
/// away inside attribute values.
fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\r', '\n', '\t']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            '\n' => out.push_str("&#xA;"),
            '\t' => out.push_str("&#x9;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn write_node<W: Write>(doc: &Document, node: NodeId, depth: usize, out: &mut W) -> Result<()> {
    let indent = "  ".repeat(depth);
    let name = doc.name(node);
    write!(out, "{indent}<{name}")?;

    // Continuation attributes align under the first one.
    let pad = indent.len() + 1 + name.len() + 1;
    for (i, (key, value)) in doc.attrs(node).enumerate() {
        if i == 0 {
            write!(out, " {key}=\"{}\"", escape(value))?;
        } else {
            write!(out, "\n{:pad$}{key}=\"{}\"", "", escape(value))?;
        }
    }

    let children = doc.children(node);
    if children.is_empty() {
        write!(out, "/>")?;
    } else {
        write!(out, ">")?;
        for &child in children {
            writeln!(out)?;
            write_node(doc, child, depth + 1, out)?;
        }
        write!(out, "\n{indent}</{name}>")?;
    }
    Ok(())
}

/// Render `doc` to `out` as a complete XML document.
pub(crate) fn write_document<W: Write>(doc: &Document, out: &mut W) -> Result<()> {
    let root = doc.root().ok_or(SaveError::InvalidRoot)?;
    writeln!(out, "{PROLOG}")?;
    write_node(doc, root, 0, out)?;
    writeln!(out)?;
    Ok(())
}
