// src/lib.rs
//! Tartan Scene Serialization
//!
//! An XML-backed save/load system for object graphs: objects describe
//! their own fields through capsules, a type registry reconstructs them
//! by name, and shared instances survive the round trip as one instance.
//!
//! ```rust,no_run
//! use tartan::{TypeRegistry, XmlExporter, XmlImporter};
//! # use tartan::{savable_ref, RegisteredSavable, Savable, SavableRef};
//! # #[derive(Debug, Default)]
//! # struct Mesh;
//! # impl Savable for Mesh {
//! #     fn type_name(&self) -> &'static str { Self::TYPE_NAME }
//! #     fn write(&self, _: &mut dyn tartan::OutputCapsule) -> tartan::Result<()> { Ok(()) }
//! #     fn read(&mut self, _: &mut dyn tartan::InputCapsule) -> tartan::Result<()> { Ok(()) }
//! #     fn as_any(&self) -> &dyn std::any::Any { self }
//! #     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
//! # }
//! # impl RegisteredSavable for Mesh {
//! #     const TYPE_NAME: &'static str = "Mesh";
//! #     fn create() -> SavableRef { savable_ref(Mesh) }
//! # }
//! # fn main() -> tartan::Result<()> {
//! let mesh = savable_ref(Mesh::default());
//! XmlExporter::new().save_to_path(&mesh, "mesh.xml")?;
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Mesh>();
//! let loaded = XmlImporter::new(registry).load_from_path("mesh.xml")?;
//! # let _ = loaded;
//! # Ok(())
//! # }
//! ```

pub mod capsule;
pub mod data;
pub mod doc;
pub mod error;
pub mod registry;
pub mod savable;
pub mod xml;

// Re-export main types for convenience
pub use capsule::{
    InputCapsule, InputCapsuleExt, OutputCapsule, OutputCapsuleExt, XmlInputCapsule,
    XmlOutputCapsule,
};
pub use data::{BitSet, Buffer, ByteBuffer, FloatBuffer, IntBuffer, ShortBuffer, TypeTag, Value};
pub use doc::{Document, NodeId};
pub use error::{ParseSource, Result, SaveError};
pub use registry::TypeRegistry;
pub use savable::{savable_ref, RegisteredSavable, Savable, SavableRef};
pub use xml::{XmlExporter, XmlImporter};
