//! Field descriptions.
//!
//! A [`Field`] is a typed, constrained attribute descriptor. Its concrete
//! shape is the closed [`FieldKind`] union; fields that describe other fields
//! (a dict's key and value, a list's elements) own those descriptions
//! outright.

use std::fmt;
use std::sync::Arc;

use crate::model::factory::DefaultFactory;
use crate::model::vocabulary::Vocabulary;
use crate::model::Value;

/// Scalar field types, each with its own text conversion and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Arbitrary bytes.
    Bytes,
    /// Bytes without line breaks.
    BytesLine,
    /// ASCII text.
    Ascii,
    /// ASCII text without line breaks.
    AsciiLine,
    /// Unicode text.
    Text,
    /// Unicode text without line breaks.
    TextLine,
    /// A password; a text line.
    Password,
    /// Source code text.
    SourceText,
    /// An absolute URI.
    Uri,
    /// A URI or a dotted name.
    Id,
    /// A dotted Python-style name.
    DottedName,
    /// A reference to a schema by dotted name.
    InterfaceField,
    /// A boolean.
    Bool,
    /// An integer.
    Int,
    /// A floating point number.
    Float,
    /// A decimal number.
    Decimal,
    /// A date and time.
    Datetime,
    /// A date.
    Date,
}

impl ScalarType {
    /// Every scalar type, in registration order.
    pub const ALL: [ScalarType; 18] = [
        ScalarType::Bytes,
        ScalarType::BytesLine,
        ScalarType::Ascii,
        ScalarType::AsciiLine,
        ScalarType::Text,
        ScalarType::TextLine,
        ScalarType::Password,
        ScalarType::SourceText,
        ScalarType::Uri,
        ScalarType::Id,
        ScalarType::DottedName,
        ScalarType::InterfaceField,
        ScalarType::Bool,
        ScalarType::Int,
        ScalarType::Float,
        ScalarType::Decimal,
        ScalarType::Datetime,
        ScalarType::Date,
    ];

    fn tag(self) -> &'static str {
        match self {
            ScalarType::Bytes => "Bytes",
            ScalarType::BytesLine => "BytesLine",
            ScalarType::Ascii => "ASCII",
            ScalarType::AsciiLine => "ASCIILine",
            ScalarType::Text => "Text",
            ScalarType::TextLine => "TextLine",
            ScalarType::Password => "Password",
            ScalarType::SourceText => "SourceText",
            ScalarType::Uri => "URI",
            ScalarType::Id => "Id",
            ScalarType::DottedName => "DottedName",
            ScalarType::InterfaceField => "InterfaceField",
            ScalarType::Bool => "Bool",
            ScalarType::Int => "Int",
            ScalarType::Float => "Float",
            ScalarType::Decimal => "Decimal",
            ScalarType::Datetime => "Datetime",
            ScalarType::Date => "Date",
        }
    }

    /// The value type tag of values of this scalar type.
    #[must_use]
    pub fn value_tag(self) -> &'static str {
        match self {
            ScalarType::Bytes | ScalarType::BytesLine => "bytes",
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Decimal => "decimal",
            ScalarType::Datetime => "datetime",
            ScalarType::Date => "date",
            _ => "text",
        }
    }

    /// Whether values have a natural order, enabling `min` and `max`.
    #[must_use]
    pub fn is_orderable(self) -> bool {
        matches!(
            self,
            ScalarType::Int
                | ScalarType::Float
                | ScalarType::Decimal
                | ScalarType::Datetime
                | ScalarType::Date
        )
    }

    /// Whether values have a length, enabling `min_length` and `max_length`.
    #[must_use]
    pub fn is_sized(self) -> bool {
        !self.is_orderable() && !matches!(self, ScalarType::Bool | ScalarType::InterfaceField)
    }

    /// Whether line breaks are forbidden.
    #[must_use]
    pub fn is_line(self) -> bool {
        matches!(
            self,
            ScalarType::BytesLine
                | ScalarType::AsciiLine
                | ScalarType::TextLine
                | ScalarType::Password
                | ScalarType::Uri
                | ScalarType::Id
                | ScalarType::DottedName
                | ScalarType::InterfaceField
        )
    }
}

/// Collection shapes of sequence fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// An ordered list.
    List,
    /// A fixed tuple.
    Tuple,
    /// A mutable set.
    Set,
    /// An immutable set.
    FrozenSet,
}

impl SequenceKind {
    /// The value type tag of values of this sequence kind.
    #[must_use]
    pub fn value_tag(self) -> &'static str {
        match self {
            SequenceKind::List => "list",
            SequenceKind::Tuple => "tuple",
            SequenceKind::Set | SequenceKind::FrozenSet => "set",
        }
    }

    /// Wraps decoded elements into a value of this kind. Sets drop repeated
    /// members, keeping the first occurrence.
    #[must_use]
    pub fn collect(self, items: Vec<Value>) -> Value {
        match self {
            SequenceKind::List => Value::List(items),
            SequenceKind::Tuple => Value::Tuple(items),
            SequenceKind::Set | SequenceKind::FrozenSet => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Value::Set(unique)
            }
        }
    }
}

/// The field type: the registry key under which a field's handler lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A scalar field.
    Scalar(ScalarType),
    /// A sequence field.
    Sequence(SequenceKind),
    /// A mapping field.
    Dict,
    /// A nested-schema field.
    Object,
    /// An enumerated choice field.
    Choice,
}

impl FieldType {
    /// `Text`.
    pub const TEXT: FieldType = FieldType::Scalar(ScalarType::Text);
    /// `TextLine`.
    pub const TEXT_LINE: FieldType = FieldType::Scalar(ScalarType::TextLine);
    /// `Bool`.
    pub const BOOL: FieldType = FieldType::Scalar(ScalarType::Bool);
    /// `Int`.
    pub const INT: FieldType = FieldType::Scalar(ScalarType::Int);
    /// `Float`.
    pub const FLOAT: FieldType = FieldType::Scalar(ScalarType::Float);
    /// `List`.
    pub const LIST: FieldType = FieldType::Sequence(SequenceKind::List);
    /// `Set`.
    pub const SET: FieldType = FieldType::Sequence(SequenceKind::Set);

    /// Every field type.
    #[must_use]
    pub fn all() -> Vec<FieldType> {
        let mut all: Vec<FieldType> = ScalarType::ALL.iter().copied().map(FieldType::Scalar).collect();
        all.extend(
            [
                SequenceKind::List,
                SequenceKind::Tuple,
                SequenceKind::Set,
                SequenceKind::FrozenSet,
            ]
            .map(FieldType::Sequence),
        );
        all.extend([FieldType::Dict, FieldType::Object, FieldType::Choice]);
        all
    }

    /// The canonical type tag written to documents.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            FieldType::Scalar(scalar) => scalar.tag(),
            FieldType::Sequence(SequenceKind::List) => "List",
            FieldType::Sequence(SequenceKind::Tuple) => "Tuple",
            FieldType::Sequence(SequenceKind::Set) => "Set",
            FieldType::Sequence(SequenceKind::FrozenSet) => "FrozenSet",
            FieldType::Dict => "Dict",
            FieldType::Object => "Object",
            FieldType::Choice => "Choice",
        }
    }

    /// Resolves a type tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<FieldType> {
        FieldType::all().into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Settings of a choice field. Exactly one of `vocabulary_name` and
/// `vocabulary` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    /// Name of a vocabulary resolved by the host at runtime.
    pub vocabulary_name: Option<String>,
    /// A resolved vocabulary object.
    pub vocabulary: Option<Vocabulary>,
}

/// The concrete shape of a field.
#[derive(Debug)]
pub enum FieldKind {
    /// A scalar.
    Scalar(ScalarType),
    /// A sequence whose elements are described by `value_type`.
    Sequence {
        /// The collection shape.
        kind: SequenceKind,
        /// Element description; untyped text elements when absent.
        value_type: Option<Box<Field>>,
    },
    /// A mapping described by its key and value fields.
    Dict {
        /// Key description; text keys when absent.
        key_type: Option<Box<Field>>,
        /// Value description; text values when absent.
        value_type: Option<Box<Field>>,
    },
    /// A nested schema, referenced by identifier.
    Object {
        /// Identifier of the target schema.
        schema: String,
    },
    /// An enumerated choice.
    Choice(Choice),
}

impl FieldKind {
    /// The field type of this shape.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Scalar(scalar) => FieldType::Scalar(*scalar),
            FieldKind::Sequence { kind, .. } => FieldType::Sequence(*kind),
            FieldKind::Dict { .. } => FieldType::Dict,
            FieldKind::Object { .. } => FieldType::Object,
            FieldKind::Choice(_) => FieldType::Choice,
        }
    }
}

/// A borrowed view of one attribute of a field.
#[derive(Debug, Clone)]
pub enum AttrRef<'a> {
    /// A plain value.
    Value(Value),
    /// An embedded field description.
    Field(&'a Field),
    /// The attribute is not set, or is not carried by value.
    Absent,
}

/// A typed, constrained attribute descriptor.
#[derive(Debug)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) required: bool,
    pub(crate) readonly: bool,
    pub(crate) default: Value,
    pub(crate) missing_value: Value,
    pub(crate) default_factory: Option<Arc<dyn DefaultFactory>>,
    pub(crate) min: Value,
    pub(crate) max: Value,
    pub(crate) min_length: u64,
    pub(crate) max_length: Option<u64>,
    pub(crate) unique: bool,
    pub(crate) order: u64,
    pub(crate) kind: FieldKind,
}

impl Field {
    /// The field's name; empty for embedded field descriptions.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Longer description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether a value other than the missing value is required.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Whether the field is read-only.
    #[must_use]
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    /// The static default.
    #[must_use]
    pub fn default(&self) -> &Value {
        &self.default
    }

    /// The sentinel meaning "no value".
    #[must_use]
    pub fn missing_value(&self) -> &Value {
        &self.missing_value
    }

    /// Lower bound, or [`Value::None`].
    #[must_use]
    pub fn min(&self) -> &Value {
        &self.min
    }

    /// Upper bound, or [`Value::None`].
    #[must_use]
    pub fn max(&self) -> &Value {
        &self.max
    }

    /// Minimum length of sized values.
    #[must_use]
    pub fn min_length(&self) -> u64 {
        self.min_length
    }

    /// Maximum length of sized values.
    #[must_use]
    pub fn max_length(&self) -> Option<u64> {
        self.max_length
    }

    /// The ordering integer assigned at construction.
    #[must_use]
    pub fn order(&self) -> u64 {
        self.order
    }

    /// The field's concrete shape.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The field's type, i.e. its registry key.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// The attached default factory.
    #[must_use]
    pub fn default_factory(&self) -> Option<&Arc<dyn DefaultFactory>> {
        self.default_factory.as_ref()
    }

    /// The default for `context`: the factory's product when a factory is
    /// attached, the static default otherwise.
    #[must_use]
    pub fn default_value(&self, context: Option<&Value>) -> Value {
        match &self.default_factory {
            Some(factory) => factory.produce(context),
            None => self.default.clone(),
        }
    }

    /// The choice settings of a choice field.
    #[must_use]
    pub fn choice(&self) -> Option<&Choice> {
        match &self.kind {
            FieldKind::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    /// Returns the named attribute as handlers see it.
    ///
    /// Attributes that can only be written by dedicated handler logic
    /// (`values`, `source`, `default_factory`) read as [`AttrRef::Absent`].
    #[must_use]
    pub fn attribute(&self, name: &str) -> AttrRef<'_> {
        fn optional(value: Option<&Field>) -> AttrRef<'_> {
            value.map_or(AttrRef::Absent, AttrRef::Field)
        }
        match name {
            "title" => AttrRef::Value(Value::Text(self.title.clone())),
            "description" => AttrRef::Value(Value::Text(self.description.clone())),
            "required" => AttrRef::Value(Value::Bool(self.required)),
            "readonly" => AttrRef::Value(Value::Bool(self.readonly)),
            "default" => AttrRef::Value(self.default.clone()),
            "missing_value" => AttrRef::Value(self.missing_value.clone()),
            "min" => AttrRef::Value(self.min.clone()),
            "max" => AttrRef::Value(self.max.clone()),
            "min_length" => AttrRef::Value(Value::Int(to_i64(self.min_length))),
            "max_length" => AttrRef::Value(self.max_length.map(to_i64).into()),
            "unique" => AttrRef::Value(Value::Bool(self.unique)),
            "order" => AttrRef::Value(Value::Int(to_i64(self.order))),
            "value_type" => match &self.kind {
                FieldKind::Sequence { value_type, .. } | FieldKind::Dict { value_type, .. } => {
                    optional(value_type.as_deref())
                }
                _ => AttrRef::Absent,
            },
            "key_type" => match &self.kind {
                FieldKind::Dict { key_type, .. } => optional(key_type.as_deref()),
                _ => AttrRef::Absent,
            },
            "schema" => match &self.kind {
                FieldKind::Object { schema } => AttrRef::Value(Value::Text(schema.clone())),
                _ => AttrRef::Absent,
            },
            "vocabulary" | "vocabulary_name" => match &self.kind {
                FieldKind::Choice(choice) => {
                    AttrRef::Value(choice.vocabulary_name.clone().into())
                }
                _ => AttrRef::Absent,
            },
            _ => AttrRef::Absent,
        }
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

const fn plain_field(scalar: ScalarType) -> Field {
    Field {
        name: String::new(),
        title: String::new(),
        description: String::new(),
        required: true,
        readonly: false,
        default: Value::None,
        missing_value: Value::None,
        default_factory: None,
        min: Value::None,
        max: Value::None,
        min_length: 0,
        max_length: None,
        unique: false,
        order: 0,
        kind: FieldKind::Scalar(scalar),
    }
}

static PLAIN: [Field; 18] = [
    plain_field(ScalarType::Bytes),
    plain_field(ScalarType::BytesLine),
    plain_field(ScalarType::Ascii),
    plain_field(ScalarType::AsciiLine),
    plain_field(ScalarType::Text),
    plain_field(ScalarType::TextLine),
    plain_field(ScalarType::Password),
    plain_field(ScalarType::SourceText),
    plain_field(ScalarType::Uri),
    plain_field(ScalarType::Id),
    plain_field(ScalarType::DottedName),
    plain_field(ScalarType::InterfaceField),
    plain_field(ScalarType::Bool),
    plain_field(ScalarType::Int),
    plain_field(ScalarType::Float),
    plain_field(ScalarType::Decimal),
    plain_field(ScalarType::Datetime),
    plain_field(ScalarType::Date),
];

/// An unconstrained, unnamed field of `scalar` type. Describes attribute
/// values and the members of sequences and dicts without their own
/// description.
pub(crate) fn plain(scalar: ScalarType) -> &'static Field {
    &PLAIN[scalar as usize]
}
