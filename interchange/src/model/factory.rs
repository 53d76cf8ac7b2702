//! Default factories: callables that compute a field default on demand.
//!
//! Documents refer to factories by dotted name. Only factories that declare
//! themselves context-aware or zero-argument may be attached to a field read
//! from a document.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::Value;

/// What a default factory promises about its calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryCapability {
    /// Called with the object the field is bound to.
    ContextAware,
    /// Called without arguments.
    ZeroArgument,
    /// Makes no promise; rejected when importing.
    Unmarked,
}

/// Computes a context-dependent default for a field.
pub trait DefaultFactory: Send + Sync {
    /// Dotted name the factory is registered and referenced under.
    fn name(&self) -> &str;

    /// The factory's calling convention.
    fn capability(&self) -> FactoryCapability;

    /// Produces a default. `context` is the bound object, if any; zero-argument
    /// factories ignore it.
    fn produce(&self, context: Option<&Value>) -> Value;
}

impl fmt::Debug for dyn DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultFactory")
            .field("name", &self.name())
            .field("capability", &self.capability())
            .finish()
    }
}

/// A plain function wrapped as a [`DefaultFactory`].
pub struct FnFactory<F> {
    name: String,
    capability: FactoryCapability,
    func: F,
}

impl<F> FnFactory<F>
where
    F: Fn(Option<&Value>) -> Value + Send + Sync,
{
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, capability: FactoryCapability, func: F) -> Self {
        Self {
            name: name.into(),
            capability,
            func,
        }
    }
}

impl<F> DefaultFactory for FnFactory<F>
where
    F: Fn(Option<&Value>) -> Value + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> FactoryCapability {
        self.capability
    }

    fn produce(&self, context: Option<&Value>) -> Value {
        (self.func)(context)
    }
}

/// Factories resolvable by dotted name while reading documents.
#[derive(Debug, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn DefaultFactory>>,
}

impl FactoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under its own name, replacing any previous one.
    pub fn register(&mut self, factory: Arc<dyn DefaultFactory>) {
        self.factories.insert(factory.name().to_owned(), factory);
    }

    /// Resolves `name` to a factory usable as a field default factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Import`] if no factory is registered under `name`, or
    /// if it is neither context-aware nor zero-argument.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DefaultFactory>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::Import(format!("unknown default factory `{name}`")))?;
        match factory.capability() {
            FactoryCapability::ContextAware | FactoryCapability::ZeroArgument => {
                Ok(Arc::clone(factory))
            }
            FactoryCapability::Unmarked => Err(Error::Import(format!(
                "default factory `{name}` must be context-aware or zero-argument"
            ))),
        }
    }
}
