//! # Type Registry
//!
//! An explicit registration table mapping type-name strings to factory
//! closures. The importer resolves every concrete type through this table —
//! there is no reflective lookup. Each serializable type is registered at
//! startup, either through [`TypeRegistry::register`] (using the type's
//! [`RegisteredSavable`] implementation) or through
//! [`TypeRegistry::register_factory`] for ad-hoc factories.
//!
//! Registries hold no per-operation state and are borrowed immutably by
//! importers, so one registry can serve any number of sequential loads.

use std::collections::HashMap;

use log::{error, warn};

use crate::error::{Result, SaveError};
use crate::savable::{RegisteredSavable, SavableRef};

type Factory = Box<dyn Fn() -> SavableRef>;

/// Maps type names to construction functions.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<String, Factory>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its declared [`RegisteredSavable::TYPE_NAME`].
    pub fn register<T: RegisteredSavable>(&mut self) {
        self.register_factory(T::TYPE_NAME, T::create);
    }

    /// Register an explicit factory under `name`. Re-registering a name
    /// replaces the previous factory.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> SavableRef + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            warn!("type `{name}` registered twice; replacing factory");
        }
        self.factories.insert(name, Box::new(factory));
    }

    /// Whether `name` has a registered factory.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Construct a blank instance of the named type.
    ///
    /// Resolution failure is fatal for the surrounding import: the error
    /// propagates rather than silently dropping the object.
    pub fn instantiate(&self, name: &str) -> Result<SavableRef> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => {
                error!("cannot construct `{name}`: no registered factory");
                Err(SaveError::UnknownType(name.to_owned()))
            }
        }
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
