//! Top-level save entry point.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::capsule::XmlOutputCapsule;
use crate::error::Result;
use crate::savable::SavableRef;
use crate::xml::write_document;

/// Saves object graphs as XML.
///
/// Stateless; each save builds a fresh capsule and document, so one
/// exporter can be reused across any number of saves.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlExporter;

impl XmlExporter {
    pub fn new() -> Self {
        Self
    }

    /// Encode `object` and write the XML text to `out`.
    pub fn save<W: Write>(&self, object: &SavableRef, out: W) -> Result<()> {
        log::debug!("saving `{}`", object.borrow().type_name());
        let mut capsule = XmlOutputCapsule::new();
        capsule.write_root(object)?;
        let doc = capsule.into_document();

        let mut out = BufWriter::new(out);
        write_document(&doc, &mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Save `object` to a file, creating or truncating it.
    pub fn save_to_path<P: AsRef<Path>>(&self, object: &SavableRef, path: P) -> Result<()> {
        let path = path.as_ref();
        log::info!("saving `{}` to {}", object.borrow().type_name(), path.display());
        self.save(object, File::create(path)?)
    }
}
