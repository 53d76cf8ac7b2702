//! The field type registry of one encoding.

use std::collections::HashMap;

use crate::format::Format;
use crate::handler::FieldHandler;
use crate::model::FieldType;

/// Maps field types to their handlers.
#[derive(Debug)]
pub struct HandlerRegistry<F> {
    handlers: HashMap<FieldType, FieldHandler<F>>,
}

impl<F: Format> HandlerRegistry<F> {
    /// A registry without handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with a handler for every built-in field type.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for field_type in FieldType::all() {
            registry.register(FieldHandler::new(field_type));
        }
        registry
    }

    /// Registers `handler` under its field type, returning the handler it
    /// replaces.
    pub fn register(&mut self, handler: FieldHandler<F>) -> Option<FieldHandler<F>> {
        self.handlers.insert(handler.field_type(), handler)
    }

    /// Removes the handler for `field_type`.
    pub fn unregister(&mut self, field_type: FieldType) -> Option<FieldHandler<F>> {
        self.handlers.remove(&field_type)
    }

    /// The handler for `field_type`.
    #[must_use]
    pub fn lookup(&self, field_type: FieldType) -> Option<&FieldHandler<F>> {
        self.handlers.get(&field_type)
    }

    /// The handler for the type tagged `tag`.
    #[must_use]
    pub fn lookup_tag(&self, tag: &str) -> Option<&FieldHandler<F>> {
        FieldType::from_tag(tag).and_then(|field_type| self.lookup(field_type))
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
