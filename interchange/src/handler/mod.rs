//! Field handlers: one per field type and encoding.
//!
//! A handler knows which attributes its field type exposes, which of them
//! are hidden from reading or writing, and how each is carried: as a plain
//! value, as a value of the field's own type, or as an embedded field
//! description. Writing walks the attributes in name order and skips those
//! at their default; reading collects immediate attributes, constructs the
//! field, then applies the same-type attributes.

mod choice;
mod registry;

use std::collections::BTreeMap;
use std::marker::PhantomData;

use log::{trace, warn};

use crate::codec;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::model::field::plain;
use crate::model::{
    AttrRef, AttrValue, FactoryRegistry, Field, FieldBuilder, FieldType, ScalarType, Value,
    Vocabulary,
};
use crate::node::Node;

pub use registry::HandlerRegistry;

/// Same-type attributes validated against the field, in application order.
pub const VALIDATED_ATTRIBUTES: [&str; 3] = ["min", "max", "default"];

/// Same-type attributes applied without validation, after the validated ones.
pub const UNVALIDATED_ATTRIBUTES: [&str; 1] = ["missing_value"];

/// Attributes written even when equal to the field's missing value.
pub const FORCED_ATTRIBUTES: [&str; 2] = ["default", "missing_value"];

/// The handler shapes. Every dispatch on a handler's behaviour matches on
/// this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Scalars and sequences.
    Base,
    /// Dicts, with embedded key and value descriptions.
    Mapping,
    /// Nested-schema fields, whose values cannot be written.
    Object,
    /// Choice fields, with dedicated vocabulary handling.
    Choice,
}

impl HandlerKind {
    /// The shape handling `field_type`.
    #[must_use]
    pub fn of(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Scalar(_) | FieldType::Sequence(_) => HandlerKind::Base,
            FieldType::Dict => HandlerKind::Mapping,
            FieldType::Object => HandlerKind::Object,
            FieldType::Choice => HandlerKind::Choice,
        }
    }
}

/// How an attribute's value is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// A value of a fixed scalar type.
    Plain(ScalarType),
    /// A value of the field's own type, validated against the field.
    SameType,
    /// A value of the field's own type, not validated.
    Unvalidated,
    /// An embedded field description.
    FieldInstance,
    /// A default factory reference, by dotted name.
    Factory,
    /// An inline choice vocabulary.
    Values,
    /// A choice source binder reference, by dotted name.
    Source,
}

/// Which directions skip an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Read and written.
    #[default]
    None,
    /// Skipped when reading.
    Read,
    /// Skipped when writing.
    Write,
    /// Skipped both ways.
    Both,
}

impl Filter {
    /// Whether reading skips the attribute.
    #[must_use]
    pub fn skips_read(self) -> bool {
        matches!(self, Filter::Read | Filter::Both)
    }

    /// Whether writing skips the attribute.
    #[must_use]
    pub fn skips_write(self) -> bool {
        matches!(self, Filter::Write | Filter::Both)
    }
}

/// One attribute exposed by a field type.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    /// How the value is carried.
    pub kind: AttrKind,
    /// Directions that skip the attribute.
    pub filter: Filter,
    /// The attribute's own default; values equal to it are not written.
    pub default: Value,
}

impl AttributeSpec {
    fn new(kind: AttrKind, default: Value) -> Self {
        Self {
            kind,
            filter: Filter::None,
            default,
        }
    }

    fn filtered(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Collaborators consulted while reading fields.
#[derive(Debug)]
pub struct ReadContext<'a, F: Format> {
    /// Handlers for embedded field descriptions.
    pub registry: &'a HandlerRegistry<F>,
    /// Factories resolvable by dotted name.
    pub factories: &'a FactoryRegistry,
}

/// Reads and writes the fields of one type in one encoding.
#[derive(Debug)]
pub struct FieldHandler<F> {
    field_type: FieldType,
    kind: HandlerKind,
    attributes: BTreeMap<&'static str, AttributeSpec>,
    _format: PhantomData<fn() -> F>,
}

impl<F: Format> FieldHandler<F> {
    /// The handler for `field_type`, exposing that type's attributes.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        let kind = HandlerKind::of(field_type);
        Self {
            field_type,
            kind,
            attributes: catalog(field_type, kind),
            _format: PhantomData,
        }
    }

    /// The handled field type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// The handler shape.
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// The exposed attributes, by name.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<&'static str, AttributeSpec> {
        &self.attributes
    }

    /// Writes `field` as a node called `element_name`. `name` is set as the
    /// node's `name` attribute unless empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] if an attribute value, an embedded field or
    /// the choice vocabulary cannot be represented.
    pub fn write(
        &self,
        field: &Field,
        name: &str,
        element_name: &str,
        registry: &HandlerRegistry<F>,
    ) -> Result<Node> {
        let mut node = Node::new(element_name);
        if !name.is_empty() {
            node.set_attribute("name", name);
        }
        node.set_attribute(codec::TYPE, self.field_type.tag());

        for (&attribute, spec) in &self.attributes {
            if spec.filter.skips_write() {
                continue;
            }
            if let Some(child) = self.write_attribute(field, attribute, spec, registry)? {
                trace!("{}: wrote `{attribute}` of {:?}", F::NAME, field.name());
                node.push(child);
            }
        }

        match self.kind {
            HandlerKind::Base | HandlerKind::Mapping | HandlerKind::Object => {}
            HandlerKind::Choice => match field.choice() {
                Some(settings) => node.push(choice::write_vocabulary::<F>(settings)?),
                None => {
                    return Err(Error::Export(format!(
                        "{} handler cannot write a {} field",
                        self.field_type,
                        field.field_type()
                    )))
                }
            },
        }
        Ok(node)
    }

    fn write_attribute(
        &self,
        field: &Field,
        attribute: &str,
        spec: &AttributeSpec,
        registry: &HandlerRegistry<F>,
    ) -> Result<Option<Node>> {
        match field.attribute(attribute) {
            AttrRef::Absent => Ok(None),
            AttrRef::Field(inner) => {
                let handler = registry.lookup(inner.field_type()).ok_or_else(|| {
                    Error::Export(format!(
                        "type {} used for `{attribute}` is not supported",
                        inner.field_type()
                    ))
                })?;
                handler.write(inner, "", attribute, registry).map(Some)
            }
            AttrRef::Value(value) => {
                if value == spec.default {
                    return Ok(None);
                }
                let force = FORCED_ATTRIBUTES.contains(&attribute);
                let descriptor = match spec.kind {
                    AttrKind::SameType | AttrKind::Unvalidated => field,
                    AttrKind::Plain(scalar) => plain(scalar),
                    AttrKind::FieldInstance
                    | AttrKind::Factory
                    | AttrKind::Values
                    | AttrKind::Source => return Ok(None),
                };
                codec::encode::<F>(descriptor, &value, attribute, force).map(Some)
            }
        }
    }

    /// Reads a field from `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Import`] for an embedded field of unknown type or an
    /// unusable default factory, [`Error::Decode`] for mistyped values, and
    /// [`Error::Value`] if the field cannot be constructed from the
    /// attributes read.
    pub fn read(&self, node: &Node, ctx: &ReadContext<'_, F>) -> Result<Field> {
        let mut builder = FieldBuilder::new(self.field_type);
        if let Some(name) = node.attribute("name") {
            builder.set("name", AttrValue::Value(Value::Text(name.to_owned())))?;
        }
        let mut validated: BTreeMap<&str, &Node> = BTreeMap::new();
        let mut unvalidated: BTreeMap<&str, &Node> = BTreeMap::new();

        for child in &node.children {
            let attribute = child.name.as_str();
            let Some(spec) = self.attributes.get(attribute) else {
                warn!(
                    "{}: ignoring unknown attribute `{attribute}` of a {} field",
                    F::NAME,
                    self.field_type
                );
                continue;
            };
            if spec.filter.skips_read() {
                continue;
            }
            trace!("{}: reading `{attribute}`", F::NAME);
            match spec.kind {
                AttrKind::SameType => {
                    validated.insert(attribute, child);
                }
                AttrKind::Unvalidated => {
                    unvalidated.insert(attribute, child);
                }
                AttrKind::FieldInstance => {
                    let tag = child.attribute(codec::TYPE).unwrap_or_default();
                    let handler = ctx.registry.lookup_tag(tag).ok_or_else(|| {
                        Error::Import(format!("type {tag:?} used for `{attribute}` is not supported"))
                    })?;
                    builder.set(attribute, AttrValue::Field(handler.read(child, ctx)?))?;
                }
                AttrKind::Factory => {
                    let name = child.text.as_deref().unwrap_or_default().trim();
                    builder.set(attribute, AttrValue::Factory(ctx.factories.resolve(name)?))?;
                }
                AttrKind::Values => {
                    let vocabulary = choice::read_values::<F>(child)?;
                    builder.set("vocabulary", AttrValue::Vocabulary(vocabulary))?;
                }
                AttrKind::Source => {
                    let name = child.text.as_deref().unwrap_or_default().trim();
                    builder.set(
                        attribute,
                        AttrValue::Vocabulary(Vocabulary::SourceBinder(name.to_owned())),
                    )?;
                }
                AttrKind::Plain(scalar) => {
                    let value = codec::decode::<F>(plain(scalar), child)?;
                    builder.set(attribute, AttrValue::Value(value))?;
                }
            }
        }

        let mut pending = builder.construct()?;
        for attribute in VALIDATED_ATTRIBUTES {
            if let Some(child) = validated.get(attribute) {
                let value = codec::decode::<F>(pending.field(), child)?;
                pending.set_validated(attribute, value)?;
            }
        }
        for attribute in UNVALIDATED_ATTRIBUTES {
            if let Some(child) = unvalidated.get(attribute) {
                let value = codec::decode::<F>(pending.field(), child)?;
                pending.set_unvalidated(attribute, value)?;
            }
        }
        pending.finalize()
    }
}

/// The attributes exposed by `field_type`.
fn catalog(field_type: FieldType, kind: HandlerKind) -> BTreeMap<&'static str, AttributeSpec> {
    use AttrKind::{Plain, SameType, Unvalidated};

    let text = |default: &str| Value::Text(default.to_owned());
    let mut attributes = BTreeMap::from([
        ("title", AttributeSpec::new(Plain(ScalarType::TextLine), text(""))),
        ("description", AttributeSpec::new(Plain(ScalarType::Text), text(""))),
        ("required", AttributeSpec::new(Plain(ScalarType::Bool), Value::Bool(true))),
        ("readonly", AttributeSpec::new(Plain(ScalarType::Bool), Value::Bool(false))),
        ("default", AttributeSpec::new(SameType, Value::None)),
        ("missing_value", AttributeSpec::new(Unvalidated, Value::None)),
        (
            "default_factory",
            AttributeSpec::new(AttrKind::Factory, Value::None).filtered(Filter::Write),
        ),
        (
            "order",
            AttributeSpec::new(Plain(ScalarType::Int), Value::None).filtered(Filter::Both),
        ),
    ]);

    let sized = match field_type {
        FieldType::Scalar(scalar) => {
            if scalar.is_orderable() {
                attributes.insert("min", AttributeSpec::new(SameType, Value::None));
                attributes.insert("max", AttributeSpec::new(SameType, Value::None));
            }
            scalar.is_sized()
        }
        FieldType::Sequence(_) => {
            attributes.insert(
                "unique",
                AttributeSpec::new(Plain(ScalarType::Bool), Value::Bool(false))
                    .filtered(Filter::Both),
            );
            true
        }
        FieldType::Dict => true,
        FieldType::Object | FieldType::Choice => false,
    };
    if sized {
        attributes.insert(
            "min_length",
            AttributeSpec::new(Plain(ScalarType::Int), Value::Int(0)),
        );
        attributes.insert(
            "max_length",
            AttributeSpec::new(Plain(ScalarType::Int), Value::None),
        );
    }
    if matches!(field_type, FieldType::Sequence(_)) {
        attributes.insert(
            "value_type",
            AttributeSpec::new(AttrKind::FieldInstance, Value::None),
        );
    }

    match kind {
        HandlerKind::Base => {}
        HandlerKind::Mapping => {
            for attribute in ["key_type", "value_type"] {
                attributes.insert(
                    attribute,
                    AttributeSpec::new(AttrKind::FieldInstance, Value::None),
                );
            }
        }
        HandlerKind::Object => {
            attributes.insert(
                "schema",
                AttributeSpec::new(Plain(ScalarType::InterfaceField), Value::None),
            );
            for attribute in ["default", "missing_value"] {
                if let Some(spec) = attributes.get_mut(attribute) {
                    spec.filter = Filter::Write;
                }
            }
        }
        HandlerKind::Choice => {
            attributes.insert(
                "vocabulary",
                AttributeSpec::new(Plain(ScalarType::TextLine), Value::None)
                    .filtered(Filter::Write),
            );
            attributes.insert(
                "values",
                AttributeSpec::new(AttrKind::Values, Value::None).filtered(Filter::Write),
            );
            attributes.insert(
                "source",
                AttributeSpec::new(AttrKind::Source, Value::None).filtered(Filter::Write),
            );
            attributes.insert(
                "vocabulary_name",
                AttributeSpec::new(Plain(ScalarType::TextLine), Value::None)
                    .filtered(Filter::Both),
            );
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Document, Markup};
    use crate::model::{DefaultFactory, FactoryCapability, FnFactory};
    use std::sync::Arc;

    fn ctx<F: Format>(factories: &FactoryRegistry) -> ReadContext<'_, F> {
        ReadContext {
            registry: F::registry(),
            factories,
        }
    }

    fn handler<F: Format>(field_type: FieldType) -> &'static FieldHandler<F> {
        F::registry().lookup(field_type).unwrap()
    }

    #[test]
    fn writes_only_non_default_attributes_sorted() {
        let field = FieldBuilder::new(FieldType::INT)
            .name("age")
            .title("Age")
            .min(0)
            .default(3)
            .build()
            .unwrap();
        let node = handler::<Markup>(FieldType::INT)
            .write(&field, "age", "field", Markup::registry())
            .unwrap();
        let names: Vec<&str> = node.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["default", "min", "title"]);
        assert_eq!(node.attribute("name"), Some("age"));
        assert_eq!(node.attribute("type"), Some("Int"));
    }

    #[test]
    fn order_and_unique_are_never_written() {
        let field = FieldBuilder::new(FieldType::LIST)
            .unique(true)
            .build()
            .unwrap();
        let node = handler::<Markup>(FieldType::LIST)
            .write(&field, "", "field", Markup::registry())
            .unwrap();
        assert!(node.child("order").is_none());
        assert!(node.child("unique").is_none());
    }

    #[test]
    fn embedded_fields_recurse() {
        let key = FieldBuilder::new(FieldType::TEXT_LINE).build().unwrap();
        let value = FieldBuilder::new(FieldType::INT).max(9).build().unwrap();
        let field = FieldBuilder::new(FieldType::Dict)
            .name("scores")
            .key_type(key)
            .value_type(value)
            .build()
            .unwrap();
        let dict = handler::<Document>(FieldType::Dict);
        let node = dict
            .write(&field, "scores", "field", Document::registry())
            .unwrap();
        assert_eq!(node.child("key_type").and_then(|n| n.attribute("type")), Some("TextLine"));

        let factories = FactoryRegistry::new();
        let read = dict.read(&node, &ctx::<Document>(&factories)).unwrap();
        match read.attribute("value_type") {
            AttrRef::Field(inner) => assert_eq!(inner.max(), &Value::Int(9)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_embedded_type_is_an_import_error() {
        let node = Node::new("field")
            .with_attribute("type", "List")
            .with_attribute("name", "x");
        let mut node = node;
        node.push(Node::new("value_type").with_attribute("type", "Nope"));
        let factories = FactoryRegistry::new();
        let err = handler::<Markup>(FieldType::LIST)
            .read(&node, &ctx::<Markup>(&factories))
            .unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn default_factory_is_read_not_written() {
        let mut factories = FactoryRegistry::new();
        let factory: Arc<dyn DefaultFactory> = Arc::new(FnFactory::new(
            "pkg.answer",
            FactoryCapability::ZeroArgument,
            |_| Value::Int(42),
        ));
        factories.register(Arc::clone(&factory));
        let field = FieldBuilder::new(FieldType::INT)
            .default_factory(factory)
            .build()
            .unwrap();
        let int = handler::<Markup>(FieldType::INT);
        let mut node = int.write(&field, "n", "field", Markup::registry()).unwrap();
        assert!(node.child("default_factory").is_none());

        node.push(Node::new("default_factory").with_text("pkg.answer"));
        let read = int.read(&node, &ctx::<Markup>(&factories)).unwrap();
        assert_eq!(read.default_value(None), Value::Int(42));

        node.children.last_mut().unwrap().text = Some("pkg.unknown".into());
        let err = int.read(&node, &ctx::<Markup>(&factories)).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn missing_value_bypasses_validation_on_read() {
        let field = FieldBuilder::new(FieldType::INT)
            .min(10)
            .missing_value(-1)
            .build()
            .unwrap();
        let int = handler::<Markup>(FieldType::INT);
        let node = int.write(&field, "n", "field", Markup::registry()).unwrap();
        let factories = FactoryRegistry::new();
        let read = int.read(&node, &ctx::<Markup>(&factories)).unwrap();
        assert_eq!(read.min(), &Value::Int(10));
        assert_eq!(read.missing_value(), &Value::Int(-1));
    }

    #[test]
    fn object_fields_hide_default_and_missing_value() {
        let object = handler::<Markup>(FieldType::Object);
        assert!(object.attributes()["default"].filter.skips_write());
        assert!(!object.attributes()["default"].filter.skips_read());
        assert_eq!(object.kind(), HandlerKind::Object);
    }
}
