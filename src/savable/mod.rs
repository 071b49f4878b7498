//! # Savable Contract
//!
//! [`Savable`] is the capability contract for any object that participates
//! in serialization: it writes its own fields into an [`OutputCapsule`] and
//! reads them back from an [`InputCapsule`], delegating nested savables
//! recursively through the capsule entry points.
//!
//! Savables travel as [`SavableRef`] handles (`Rc<RefCell<dyn Savable>>`).
//! Shared ownership is what makes identity-preserving serialization work:
//! two fields holding the same `Rc` are encoded once plus a reference, and
//! decode back to the *same* reconstructed instance.
//!
//! ## Implementing
//!
//! ```rust
//! use tartan::{savable_ref, InputCapsule, OutputCapsule, RegisteredSavable, Savable, SavableRef};
//!
//! #[derive(Debug, Default)]
//! struct Material {
//!     name: String,
//!     shininess: f32,
//! }
//!
//! impl Savable for Material {
//!     fn type_name(&self) -> &'static str {
//!         Self::TYPE_NAME
//!     }
//!
//!     fn write(&self, capsule: &mut dyn OutputCapsule) -> tartan::Result<()> {
//!         capsule.write_str(&self.name, "name", "")?;
//!         capsule.write_f32(self.shininess, "shininess", 0.0)
//!     }
//!
//!     fn read(&mut self, capsule: &mut dyn InputCapsule) -> tartan::Result<()> {
//!         self.name = capsule.read_str("name", "")?;
//!         self.shininess = capsule.read_f32("shininess", 0.0)?;
//!         Ok(())
//!     }
//!
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//!
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
//!         self
//!     }
//! }
//!
//! impl RegisteredSavable for Material {
//!     const TYPE_NAME: &'static str = "Material";
//!
//!     fn create() -> SavableRef {
//!         savable_ref(Material::default())
//!     }
//! }
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::capsule::{InputCapsule, OutputCapsule};
use crate::error::Result;

/// Shared handle to a serializable object.
pub type SavableRef = Rc<RefCell<dyn Savable>>;

/// A domain object capable of serializing and deserializing its own fields
/// through the capsule callback contract.
pub trait Savable: std::fmt::Debug + 'static {
    /// Stable class tag for this type. Written as the element name (or a
    /// `class` attribute) and looked up in the type registry on read.
    fn type_name(&self) -> &'static str;

    /// Write this object's fields into the capsule. Nested savables are
    /// written by calling back into the capsule's savable entry points.
    fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()>;

    /// Populate this (freshly constructed) instance from the capsule.
    ///
    /// When this runs during a cyclic read, back-references resolve to
    /// this instance *before* it is fully populated — consumers must not
    /// inspect back-referenced fields until the whole load completes.
    fn read(&mut self, capsule: &mut dyn InputCapsule) -> Result<()>;

    /// Downcast support for consumers.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support for consumers.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Types that can be registered with a [`TypeRegistry`] by name.
///
/// `create` plays the role of either the default constructor or a named
/// factory: the choice is made once, at registration time, rather than
/// discovered reflectively. Immutable or validated types implement `create`
/// with their own builder instead of `Default`.
///
/// [`TypeRegistry`]: crate::registry::TypeRegistry
pub trait RegisteredSavable: Savable + Sized {
    /// The stable type name, matching [`Savable::type_name`].
    const TYPE_NAME: &'static str;

    /// Construct a blank instance, ready for [`Savable::read`].
    fn create() -> SavableRef;
}

/// Wrap a value into a [`SavableRef`].
pub fn savable_ref<T: Savable>(value: T) -> SavableRef {
    Rc::new(RefCell::new(value))
}

/// Object identity for the write-side reference tracker: the `Rc`
/// allocation address, thinned to drop the vtable half of the fat pointer.
pub(crate) fn identity(handle: &SavableRef) -> *const () {
    Rc::as_ptr(handle) as *const ()
}
