//! Whole-model serialization.
//!
//! A [`Serializer`] walks a [`Model`] into an encoding-neutral [`Node`] tree
//! and reads such a tree back. Per schema, the walk emits the fields outside
//! any fieldset by ordering integer, then each fieldset with its members in
//! fieldset order, then the invariant references, then whatever the schema
//! metadata handlers add. The translation domain is hoisted to the root.
//!
//! The concrete renderings live in [`markup`] and [`document`].

#[cfg(feature = "document")]
pub mod document;
#[cfg(feature = "markup")]
pub mod markup;

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, trace};

use crate::codec;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::handler::{HandlerRegistry, ReadContext};
use crate::metadata::{hoist_translation_domain, MetadataHandlers, MODEL_NAMESPACE};
use crate::model::{FactoryRegistry, Field, Fieldset, Model, Schema};
use crate::node::Node;

/// Name of the document root node.
pub const MODEL: &str = "model";
/// Name of schema nodes.
pub const SCHEMA: &str = "schema";
/// Name of top-level field nodes.
pub const FIELD: &str = "field";
/// Name of fieldset nodes.
pub const FIELDSET: &str = "fieldset";
/// Name of invariant reference nodes.
pub const INVARIANT: &str = "invariant";
/// Attribute listing a schema's base names.
pub const BASED_ON: &str = "based-on";

/// Converts models to and from node trees in the encoding `F`.
#[derive(Debug)]
pub struct Serializer<'r, F: Format> {
    registry: &'r HandlerRegistry<F>,
    metadata: MetadataHandlers,
    factories: Arc<FactoryRegistry>,
    known: Vec<Arc<Schema>>,
}

impl<F: Format> Serializer<'static, F> {
    /// A serializer using the encoding's process-wide registry, no metadata
    /// handlers and no default factories.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: F::registry(),
            metadata: MetadataHandlers::new(),
            factories: Arc::new(FactoryRegistry::new()),
            known: Vec::new(),
        }
    }
}

impl<F: Format> Default for Serializer<'static, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r, F: Format> Serializer<'r, F> {
    /// Uses `registry` instead of the process-wide one.
    #[must_use]
    pub fn with_registry<'s>(self, registry: &'s HandlerRegistry<F>) -> Serializer<'s, F> {
        Serializer {
            registry,
            metadata: self.metadata,
            factories: self.factories,
            known: self.known,
        }
    }

    /// Uses `metadata` as the active metadata handlers.
    #[must_use]
    pub fn with_metadata(mut self, metadata: MetadataHandlers) -> Self {
        self.metadata = metadata;
        self
    }

    /// Resolves default factory references through `factories`.
    #[must_use]
    pub fn with_factories(mut self, factories: Arc<FactoryRegistry>) -> Self {
        self.factories = factories;
        self
    }

    /// Makes schemata outside the document available as bases.
    #[must_use]
    pub fn with_known_schemata<I>(mut self, schemata: I) -> Self
    where
        I: IntoIterator<Item = Arc<Schema>>,
    {
        self.known.extend(schemata);
        self
    }

    /// Walks `model` into a node tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for a field whose type has no handler,
    /// [`Error::Export`] for anything a handler cannot represent, and any
    /// error raised by a metadata handler.
    pub fn write_tree(&self, model: &Model) -> Result<Node> {
        let mut root = Node::new(MODEL).with_attribute("xmlns", MODEL_NAMESPACE);
        for (prefix, namespace) in self.metadata.namespaces() {
            root.set_attribute(format!("xmlns:{prefix}"), namespace);
        }
        for schema in model.schemata() {
            root.push(self.write_schema(schema)?);
        }
        hoist_translation_domain(&mut root);
        Ok(root)
    }

    fn write_schema(&self, schema: &Schema) -> Result<Node> {
        debug!(
            "{}: writing schema {:?} with {} fields",
            F::NAME,
            schema.name(),
            schema.fields().len()
        );
        let mut node = Node::new(SCHEMA);
        if !schema.name().is_empty() {
            node.set_attribute("name", schema.name());
        }
        let bases: Vec<&str> = schema
            .bases()
            .iter()
            .map(|base| base.name())
            .filter(|name| !name.is_empty())
            .collect();
        if !bases.is_empty() {
            node.set_attribute(BASED_ON, bases.join(" "));
        }

        let grouped: HashSet<&str> = schema
            .fieldsets()
            .iter()
            .flat_map(|fieldset| fieldset.fields.iter().map(String::as_str))
            .collect();
        for field in schema.fields() {
            if !grouped.contains(field.name()) {
                node.push(self.write_field(schema, field)?);
            }
        }

        for fieldset in schema.fieldsets() {
            let mut group = Node::new(FIELDSET).with_attribute("name", &fieldset.name);
            if let Some(label) = fieldset.label.as_deref().filter(|l| !l.is_empty()) {
                group.set_attribute("label", label);
            }
            if let Some(description) = fieldset.description.as_deref().filter(|d| !d.is_empty()) {
                group.set_attribute("description", description);
            }
            for member in &fieldset.fields {
                let field = schema.get(member).ok_or_else(|| {
                    Error::Value(format!(
                        "fieldset {:?} names unknown field {member:?}",
                        fieldset.name
                    ))
                })?;
                group.push(self.write_field(schema, field)?);
            }
            node.push(group);
        }

        for invariant in schema.invariants() {
            node.push(Node::new(INVARIANT).with_text(invariant));
        }

        for handler in self.metadata.schema_handlers() {
            handler.write(&mut node, schema)?;
        }
        Ok(node)
    }

    fn write_field(&self, schema: &Schema, field: &Field) -> Result<Node> {
        let field_type = field.field_type();
        let handler = self.registry.lookup(field_type).ok_or_else(|| {
            Error::Value(format!(
                "field type {field_type} specified for field {:?} is not supported",
                field.name()
            ))
        })?;
        trace!("{}: writing field {:?} ({field_type})", F::NAME, field.name());
        let mut node = handler.write(field, field.name(), FIELD, self.registry)?;
        for metadata in self.metadata.field_handlers() {
            metadata.write(&mut node, schema, field)?;
        }
        Ok(node)
    }

    /// Reads a model from a node tree.
    ///
    /// Bases named in `based-on` resolve against the other schemata of the
    /// document, then against the known schemata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Import`] for a malformed tree or an unknown base,
    /// [`Error::Value`] for a field of unsupported type or an invalid
    /// attribute set, and whatever the handlers raise.
    pub fn read_tree(&self, root: &Node) -> Result<Model> {
        if root.name != MODEL {
            return Err(Error::Import(format!(
                "expected a `{MODEL}` root, found `{}`",
                root.name
            )));
        }
        let mut pending: Vec<&Node> = Vec::new();
        for child in &root.children {
            if child.name == SCHEMA {
                pending.push(child);
            } else {
                trace!("{}: skipping `{}` under the root", F::NAME, child.name);
            }
        }

        // Schemas are read once their bases are available, whatever their
        // position in the document.
        let mut model = Model::new();
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for node in pending {
                if self.bases_available(node, &model) {
                    let schema = self.read_schema(node, &model)?;
                    model.insert(schema);
                } else {
                    deferred.push(node);
                }
            }
            if deferred.len() == before {
                // Unknown or cyclic bases: reading reports the first one.
                let schema = self.read_schema(deferred.remove(0), &model)?;
                model.insert(schema);
            }
            pending = deferred;
        }
        Ok(model)
    }

    fn bases_available(&self, node: &Node, model: &Model) -> bool {
        node.attribute(BASED_ON)
            .unwrap_or_default()
            .split_whitespace()
            .all(|base| self.resolve_base(base, model).is_some())
    }

    fn resolve_base<'m>(&'m self, base: &str, model: &'m Model) -> Option<&'m Arc<Schema>> {
        model
            .get(base)
            .or_else(|| self.known.iter().find(|known| known.name() == base))
    }

    fn read_schema(&self, node: &Node, model: &Model) -> Result<Schema> {
        let mut schema = Schema::new(node.attribute("name").unwrap_or_default());
        debug!("{}: reading schema {:?}", F::NAME, schema.name());
        for base in node.attribute(BASED_ON).unwrap_or_default().split_whitespace() {
            let resolved = self
                .resolve_base(base, model)
                .ok_or_else(|| Error::Import(format!("unknown base schema {base:?}")))?;
            schema.add_base(Arc::clone(resolved));
        }

        let ctx = ReadContext {
            registry: self.registry,
            factories: &self.factories,
        };
        for child in &node.children {
            match child.name.as_str() {
                FIELD => {
                    self.read_field(child, &mut schema, &ctx)?;
                }
                FIELDSET => {
                    let name = child.attribute("name").ok_or_else(|| {
                        Error::Import(format!("fieldset without a name in schema {:?}", schema.name()))
                    })?;
                    let mut members = Vec::new();
                    for field in child.children_named(FIELD) {
                        members.push(self.read_field(field, &mut schema, &ctx)?);
                    }
                    schema.add_fieldset(Fieldset {
                        name: name.to_owned(),
                        label: child.attribute("label").map(str::to_owned),
                        description: child.attribute("description").map(str::to_owned),
                        fields: members,
                    })?;
                }
                INVARIANT => {
                    let reference = child.text.as_deref().unwrap_or_default().trim();
                    if !reference.is_empty() {
                        schema.add_invariant(reference);
                    }
                }
                other => trace!("{}: leaving `{other}` to metadata handlers", F::NAME),
            }
        }

        for handler in self.metadata.schema_handlers() {
            handler.read(node, &mut schema)?;
        }
        Ok(schema)
    }

    fn read_field(
        &self,
        node: &Node,
        schema: &mut Schema,
        ctx: &ReadContext<'_, F>,
    ) -> Result<String> {
        let tag = node.attribute(codec::TYPE).unwrap_or_default();
        let handler = self.registry.lookup_tag(tag).ok_or_else(|| {
            Error::Value(format!(
                "field type {tag} specified for field {:?} is not supported",
                node.attribute("name").unwrap_or_default()
            ))
        })?;
        let field = handler.read(node, ctx)?;
        for metadata in self.metadata.field_handlers() {
            metadata.read(node, schema, &field)?;
        }
        let name = field.name().to_owned();
        trace!("{}: read field {name:?} ({tag})", F::NAME);
        schema.add_field(field)?;
        Ok(name)
    }
}
