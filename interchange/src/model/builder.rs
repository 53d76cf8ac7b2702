//! Two-phase field construction.
//!
//! Attributes that share the field's own value type (`min`, `max`,
//! `default`) can only be validated once the field exists, and the missing
//! value may legitimately violate the field's own constraints. Construction
//! therefore happens in two steps: a [`FieldBuilder`] collects the immediate
//! attributes and [`FieldBuilder::construct`] turns them into a
//! [`PendingField`], on which the deferred attributes are applied before
//! [`PendingField::finalize`] hands out the finished [`Field`].

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::convert;
use crate::model::factory::DefaultFactory;
use crate::model::field::{Choice, Field, FieldKind, FieldType};
use crate::model::order;
use crate::model::vocabulary::Vocabulary;
use crate::model::Value;

/// A decoded attribute value handed to [`FieldBuilder::set`].
#[derive(Debug)]
pub enum AttrValue {
    /// A plain value.
    Value(Value),
    /// An embedded field description (`key_type`, `value_type`).
    Field(Field),
    /// A resolved vocabulary (`vocabulary`, `source`).
    Vocabulary(Vocabulary),
    /// A resolved default factory.
    Factory(Arc<dyn DefaultFactory>),
}

/// Collects the attributes of a field before construction.
#[derive(Debug)]
pub struct FieldBuilder {
    field_type: FieldType,
    name: String,
    title: String,
    description: String,
    required: bool,
    readonly: bool,
    default_factory: Option<Arc<dyn DefaultFactory>>,
    min_length: u64,
    max_length: Option<u64>,
    unique: bool,
    key_type: Option<Field>,
    value_type: Option<Field>,
    schema: Option<String>,
    vocabulary_name: Option<String>,
    vocabulary: Option<Vocabulary>,
    min: Value,
    max: Value,
    default: Value,
    missing_value: Value,
}

impl FieldBuilder {
    /// Starts a field of the given type with every attribute at its default.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            name: String::new(),
            title: String::new(),
            description: String::new(),
            required: true,
            readonly: false,
            default_factory: None,
            min_length: 0,
            max_length: None,
            unique: false,
            key_type: None,
            value_type: None,
            schema: None,
            vocabulary_name: None,
            vocabulary: None,
            min: Value::None,
            max: Value::None,
            default: Value::None,
            missing_value: Value::None,
        }
    }

    /// The type of the field being built.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Sets the field name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets whether a value is required. Fields are required by default.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the read-only flag.
    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Sets the static default, applied and validated by [`build`](Self::build).
    #[must_use]
    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    /// Sets the missing value, applied without validation by
    /// [`build`](Self::build).
    #[must_use]
    pub fn missing_value(mut self, missing_value: impl Into<Value>) -> Self {
        self.missing_value = missing_value.into();
        self
    }

    /// Attaches a default factory.
    #[must_use]
    pub fn default_factory(mut self, factory: Arc<dyn DefaultFactory>) -> Self {
        self.default_factory = Some(factory);
        self
    }

    /// Sets the lower bound, applied and validated by [`build`](Self::build).
    #[must_use]
    pub fn min(mut self, min: impl Into<Value>) -> Self {
        self.min = min.into();
        self
    }

    /// Sets the upper bound, applied and validated by [`build`](Self::build).
    #[must_use]
    pub fn max(mut self, max: impl Into<Value>) -> Self {
        self.max = max.into();
        self
    }

    /// Sets the minimum length.
    #[must_use]
    pub fn min_length(mut self, min_length: u64) -> Self {
        self.min_length = min_length;
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Requires sequence members to be unique.
    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Describes the keys of a dict field.
    #[must_use]
    pub fn key_type(mut self, key_type: Field) -> Self {
        self.key_type = Some(key_type);
        self
    }

    /// Describes the elements of a sequence field or the values of a dict
    /// field.
    #[must_use]
    pub fn value_type(mut self, value_type: Field) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Sets the target schema of an object field.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Binds a choice field to a vocabulary resolved by name at runtime.
    #[must_use]
    pub fn vocabulary_name(mut self, name: impl Into<String>) -> Self {
        self.vocabulary_name = Some(name.into());
        self
    }

    /// Binds a choice field to a vocabulary object.
    #[must_use]
    pub fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Sets one attribute by name, as decoded from a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an unknown attribute or a value of the
    /// wrong shape.
    pub fn set(&mut self, name: &str, value: AttrValue) -> Result<()> {
        let wrong = |value: &AttrValue| {
            Error::Value(format!("attribute `{name}` cannot hold {value:?}"))
        };
        match (name, value) {
            ("key_type", AttrValue::Field(field)) => self.key_type = Some(field),
            ("value_type", AttrValue::Field(field)) => self.value_type = Some(field),
            ("vocabulary" | "source", AttrValue::Vocabulary(vocabulary)) => {
                self.vocabulary = Some(vocabulary);
            }
            ("default_factory", AttrValue::Factory(factory)) => {
                self.default_factory = Some(factory);
            }
            (_, AttrValue::Value(value)) => self.set_value(name, value)?,
            (_, other) => return Err(wrong(&other)),
        }
        Ok(())
    }

    fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        let wrong = |value: &Value| {
            Error::Value(format!(
                "attribute `{name}` cannot hold a {} value",
                value.type_tag()
            ))
        };
        match (name, value) {
            ("name", Value::Text(text)) => self.name = text,
            ("title", Value::Text(text)) => self.title = text,
            ("description", Value::Text(text)) => self.description = text,
            ("required", Value::Bool(b)) => self.required = b,
            ("readonly", Value::Bool(b)) => self.readonly = b,
            ("unique", Value::Bool(b)) => self.unique = b,
            ("min_length", Value::Int(n)) => {
                self.min_length = u64::try_from(n).map_err(|_| wrong(&Value::Int(n)))?;
            }
            ("max_length", Value::None) => self.max_length = None,
            ("max_length", Value::Int(n)) => {
                self.max_length = Some(u64::try_from(n).map_err(|_| wrong(&Value::Int(n)))?);
            }
            ("schema", Value::Text(text)) => self.schema = Some(text),
            ("vocabulary" | "vocabulary_name", Value::Text(text)) => {
                self.vocabulary_name = Some(text);
            }
            ("min", value) => self.min = value,
            ("max", value) => self.max = value,
            ("default", value) => self.default = value,
            ("missing_value", value) => self.missing_value = value,
            (
                "name" | "title" | "description" | "required" | "readonly" | "unique"
                | "min_length" | "max_length" | "schema" | "vocabulary" | "vocabulary_name",
                value,
            ) => return Err(wrong(&value)),
            (_, _) => return Err(Error::Value(format!("unknown attribute `{name}`"))),
        }
        Ok(())
    }

    /// Constructs the field from its immediate attributes and assigns it the
    /// next ordering integer.
    ///
    /// `min`, `max`, `default` and `missing_value` held by the builder are
    /// not applied here; [`build`](Self::build) applies them, and readers
    /// apply them through the returned [`PendingField`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the attribute set is inconsistent with the
    /// field type.
    pub fn construct(self) -> Result<PendingField> {
        let field_type = self.field_type;
        let inconsistent =
            |what: &str| Error::Value(format!("{field_type} field {:?}: {what}", self.name));
        if self.key_type.is_some() && field_type != FieldType::Dict {
            return Err(inconsistent("only dict fields have a key type"));
        }
        if self.value_type.is_some()
            && !matches!(field_type, FieldType::Sequence(_) | FieldType::Dict)
        {
            return Err(inconsistent("only sequence and dict fields have a value type"));
        }
        if self.schema.is_some() && field_type != FieldType::Object {
            return Err(inconsistent("only object fields have a schema"));
        }
        if (self.vocabulary.is_some() || self.vocabulary_name.is_some())
            && field_type != FieldType::Choice
        {
            return Err(inconsistent("only choice fields have a vocabulary"));
        }
        let sized = match field_type {
            FieldType::Scalar(scalar) => scalar.is_sized(),
            FieldType::Sequence(_) | FieldType::Dict => true,
            _ => false,
        };
        if !sized && (self.min_length != 0 || self.max_length.is_some()) {
            return Err(inconsistent("only sized fields have length bounds"));
        }
        if self.unique && !matches!(field_type, FieldType::Sequence(_)) {
            return Err(inconsistent("only sequence fields can require unique members"));
        }

        let kind = match field_type {
            FieldType::Scalar(scalar) => FieldKind::Scalar(scalar),
            FieldType::Sequence(kind) => FieldKind::Sequence {
                kind,
                value_type: self.value_type.map(Box::new),
            },
            FieldType::Dict => FieldKind::Dict {
                key_type: self.key_type.map(Box::new),
                value_type: self.value_type.map(Box::new),
            },
            FieldType::Object => FieldKind::Object {
                schema: self
                    .schema
                    .ok_or_else(|| inconsistent("an object field needs a schema"))?,
            },
            FieldType::Choice => match (self.vocabulary_name, self.vocabulary) {
                (Some(_), Some(_)) => {
                    return Err(inconsistent(
                        "a choice field takes a vocabulary name or a vocabulary, not both",
                    ))
                }
                (None, None) => {
                    return Err(inconsistent("a choice field needs a vocabulary"))
                }
                (vocabulary_name, vocabulary) => FieldKind::Choice(Choice {
                    vocabulary_name,
                    vocabulary,
                }),
            },
        };

        Ok(PendingField {
            field: Field {
                name: self.name,
                title: self.title,
                description: self.description,
                required: self.required,
                readonly: self.readonly,
                default: Value::None,
                missing_value: Value::None,
                default_factory: self.default_factory,
                min: Value::None,
                max: Value::None,
                min_length: self.min_length,
                max_length: self.max_length,
                unique: self.unique,
                order: order::next(),
                kind,
            },
        })
    }

    /// Constructs the field and applies every deferred attribute: `min`,
    /// `max` and `default` validated in that order, then `missing_value`
    /// unvalidated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if construction or validation fails.
    pub fn build(mut self) -> Result<Field> {
        let validated = [
            ("min", std::mem::take(&mut self.min)),
            ("max", std::mem::take(&mut self.max)),
            ("default", std::mem::take(&mut self.default)),
        ];
        let missing_value = std::mem::take(&mut self.missing_value);
        let mut pending = self.construct()?;
        for (name, value) in validated {
            if !value.is_none() {
                pending.set_validated(name, value)?;
            }
        }
        pending.set_unvalidated("missing_value", missing_value)?;
        pending.finalize()
    }
}

/// A constructed field still accepting its deferred attributes.
#[derive(Debug)]
pub struct PendingField {
    field: Field,
}

impl PendingField {
    /// The field as constructed so far.
    #[must_use]
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Sets `min`, `max` or `default`, validating the value against the
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the attribute is not one of those three,
    /// does not apply to the field, or the value fails validation.
    pub fn set_validated(&mut self, name: &str, value: Value) -> Result<()> {
        if matches!(name, "min" | "max") && !value.is_none() {
            let orderable = matches!(self.field.kind, FieldKind::Scalar(s) if s.is_orderable());
            if !orderable {
                return Err(Error::Value(format!(
                    "{} field {:?} has no `{name}`",
                    self.field.field_type(),
                    self.field.name
                )));
            }
        }
        convert::validate(&self.field, &value)?;
        self.slot(name)
            .map(|slot| *slot = value)
            .ok_or_else(|| Error::Value(format!("`{name}` is not a validated attribute")))
    }

    /// Sets a same-type attribute without validating it. Used for
    /// `missing_value`, which may violate the field's own constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if `name` is not a same-type attribute.
    pub fn set_unvalidated(&mut self, name: &str, value: Value) -> Result<()> {
        let slot = match name {
            "missing_value" => Some(&mut self.field.missing_value),
            _ => self.slot(name),
        };
        slot.map(|slot| *slot = value)
            .ok_or_else(|| Error::Value(format!("`{name}` is not a same-type attribute")))
    }

    fn slot(&mut self, name: &str) -> Option<&mut Value> {
        match name {
            "min" => Some(&mut self.field.min),
            "max" => Some(&mut self.field.max),
            "default" => Some(&mut self.field.default),
            _ => None,
        }
    }

    /// Finishes construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if both a static default and a default
    /// factory are set.
    pub fn finalize(self) -> Result<Field> {
        if self.field.default_factory.is_some()
            && !self.field.default.is_none()
            && self.field.default != self.field.missing_value
        {
            return Err(Error::Value(format!(
                "field {:?} cannot have both a default and a default factory",
                self.field.name
            )));
        }
        Ok(self.field)
    }
}
