//! Top-level load entry point.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::capsule::XmlInputCapsule;
use crate::error::Result;
use crate::registry::TypeRegistry;
use crate::savable::SavableRef;
use crate::xml::parse_document;

/// Loads object graphs from XML against a [`TypeRegistry`].
///
/// The importer owns its registry: register every concrete type a document
/// may contain before loading it. Each load builds a fresh capsule, so
/// reference IDs never leak between documents.
#[derive(Debug)]
pub struct XmlImporter {
    registry: TypeRegistry,
}

impl XmlImporter {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    /// The registry documents are resolved against.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Mutable registry access, for registering additional types.
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Decode one object graph from already-buffered XML text.
    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<SavableRef> {
        let doc = parse_document(bytes)?;
        let mut capsule = XmlInputCapsule::new(&doc, &self.registry);
        capsule.read_root()
    }

    /// Read `input` to the end and decode it.
    pub fn load<R: Read>(&self, mut input: R) -> Result<SavableRef> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.load_from_bytes(&bytes)
    }

    /// Load an object graph from a file.
    pub fn load_from_path<P: AsRef<Path>>(&self, path: P) -> Result<SavableRef> {
        let path = path.as_ref();
        log::info!("loading savable from {}", path.display());
        self.load(File::open(path)?)
    }
}
