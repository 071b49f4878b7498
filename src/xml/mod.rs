//! # XML Boundary
//!
//! Everything that touches XML text lives here: the serializer that
//! renders a [`Document`](crate::doc::Document) to bytes, the parser that
//! rebuilds one from bytes, and the [`XmlExporter`]/[`XmlImporter`] entry
//! points that tie the capsules to streams and files.
//!
//! Escaping is handled once, at this boundary. Capsules and documents
//! store raw text; the serializer escapes on the way out and the parser
//! unescapes on the way in.

mod exporter;
mod importer;
mod parse;
mod write;

pub use exporter::XmlExporter;
pub use importer::XmlImporter;

pub(crate) use parse::parse_document;
pub(crate) use write::write_document;
