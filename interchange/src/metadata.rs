//! Metadata extension points.
//!
//! Schema-level handlers see each schema node once, after its fields are
//! written; field-level handlers see every top-level field node. Both may
//! declare a namespace and prefix, which the document root then declares.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{Field, Schema};
use crate::node::Node;

/// Default namespace of model documents.
pub const MODEL_NAMESPACE: &str = "urn:schema-interchange:model";

/// Namespace of the translation attributes.
pub const I18N_NAMESPACE: &str = "http://xml.zope.org/namespaces/i18n";

/// Attribute naming a translation domain.
pub const I18N_DOMAIN: &str = "i18n:domain";

/// Attribute marking a node as translatable.
pub const I18N_TRANSLATE: &str = "i18n:translate";

/// Contributes schema-level metadata.
pub trait SchemaMetadataHandler: Send + Sync {
    /// Namespace of the contributed attributes, if any.
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Prefix bound to [`namespace`](Self::namespace).
    fn prefix(&self) -> Option<&str> {
        None
    }

    /// Adds metadata to a written schema node.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be represented.
    fn write(&self, node: &mut Node, schema: &Schema) -> Result<()>;

    /// Reads metadata from a schema node into the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata is malformed.
    fn read(&self, node: &Node, schema: &mut Schema) -> Result<()>;
}

/// Contributes field-level metadata.
pub trait FieldMetadataHandler: Send + Sync {
    /// Namespace of the contributed attributes, if any.
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Prefix bound to [`namespace`](Self::namespace).
    fn prefix(&self) -> Option<&str> {
        None
    }

    /// Adds metadata to a written field node.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be represented.
    fn write(&self, node: &mut Node, schema: &Schema, field: &Field) -> Result<()>;

    /// Reads metadata from a field node. Runs after the field is constructed
    /// and before it is added to `schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata is malformed.
    fn read(&self, node: &Node, schema: &mut Schema, field: &Field) -> Result<()>;
}

/// The active metadata handlers.
#[derive(Clone, Default)]
pub struct MetadataHandlers {
    schema: Vec<Arc<dyn SchemaMetadataHandler>>,
    field: Vec<Arc<dyn FieldMetadataHandler>>,
}

impl fmt::Debug for MetadataHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataHandlers")
            .field("schema", &self.schema.len())
            .field("field", &self.field.len())
            .finish()
    }
}

impl MetadataHandlers {
    /// No handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a schema-level handler.
    #[must_use]
    pub fn with_schema_handler(mut self, handler: Arc<dyn SchemaMetadataHandler>) -> Self {
        self.schema.push(handler);
        self
    }

    /// Adds a field-level handler.
    #[must_use]
    pub fn with_field_handler(mut self, handler: Arc<dyn FieldMetadataHandler>) -> Self {
        self.field.push(handler);
        self
    }

    /// Schema-level handlers, in registration order.
    #[must_use]
    pub fn schema_handlers(&self) -> &[Arc<dyn SchemaMetadataHandler>] {
        &self.schema
    }

    /// Field-level handlers, in registration order.
    #[must_use]
    pub fn field_handlers(&self) -> &[Arc<dyn FieldMetadataHandler>] {
        &self.field
    }

    /// `(prefix, namespace)` declarations: `i18n` first, then every handler
    /// declaring both, schema-level before field-level. Later declarations
    /// of a prefix replace earlier ones.
    #[must_use]
    pub fn namespaces(&self) -> Vec<(String, String)> {
        let mut declared = vec![("i18n".to_owned(), I18N_NAMESPACE.to_owned())];
        let schema = self.schema.iter().map(|h| (h.prefix(), h.namespace()));
        let field = self.field.iter().map(|h| (h.prefix(), h.namespace()));
        for (prefix, namespace) in schema.chain(field) {
            let (Some(prefix), Some(namespace)) = (prefix, namespace) else {
                continue;
            };
            match declared.iter_mut().find(|(p, _)| p == prefix) {
                Some(slot) => slot.1 = namespace.to_owned(),
                None => declared.push((prefix.to_owned(), namespace.to_owned())),
            }
        }
        declared
    }
}

/// Hoists the translation domain to `root`.
///
/// The domain is the root's own `i18n:domain`, or else the domain of the
/// first translatable node. Translatable nodes carrying that same domain
/// lose their copy; nodes with another domain keep it.
pub fn hoist_translation_domain(root: &mut Node) {
    let mut domain = root.attribute(I18N_DOMAIN).map(str::to_owned);
    root.walk_mut(&mut |node| {
        if node.attribute(I18N_TRANSLATE).is_none() {
            return;
        }
        let own = node.attribute(I18N_DOMAIN).map(str::to_owned);
        if domain.is_none() {
            domain.clone_from(&own);
        }
        if own.is_some() && own == domain {
            node.remove_attribute(I18N_DOMAIN);
        }
    });
    if let Some(domain) = domain.filter(|d| !d.is_empty()) {
        root.set_attribute(I18N_DOMAIN, domain);
    }
}
