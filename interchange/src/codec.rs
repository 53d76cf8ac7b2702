//! The attribute codec: one value to or from one node.
//!
//! Scalars become a node with a text payload, sequences a node with one
//! `element` child per member, and dicts a node with one keyed `element`
//! child per entry. A value omitted in favour of the field's missing value
//! is an empty node tagged [`Value::MISSING_TAG`].

use crate::error::{Error, Result};
use crate::format::Format;
use crate::model::convert;
use crate::model::field::{plain, Field, FieldKind, ScalarType};
use crate::model::Value;
use crate::node::Node;

/// Name of the nodes holding sequence members and dict entries.
pub const ELEMENT: &str = "element";

/// Name of the attribute holding a dict entry's key.
pub const KEY: &str = "key";

/// Name of the attribute holding a value node's value type.
pub const TYPE: &str = "type";

/// Encodes `value`, described by `field`, as a node called `name`.
///
/// Unless `force` is set, a value equal to the field's missing value is
/// omitted. [`Value::None`] is always omitted.
///
/// # Errors
///
/// Returns [`Error::Export`] if the value cannot be represented for this
/// field or would not read back under its syntax, and [`Error::Value`] if
/// text conversion fails.
pub fn encode<F: Format>(field: &Field, value: &Value, name: &str, force: bool) -> Result<Node> {
    if value.is_none() || (!force && value == field.missing_value()) {
        return Ok(omitted(name));
    }
    match (field.kind(), value) {
        (
            FieldKind::Sequence { value_type, .. },
            Value::List(items) | Value::Tuple(items) | Value::Set(items),
        ) => {
            let element = value_type.as_deref().unwrap_or(plain(ScalarType::Text));
            encode_sequence::<F>(element, value.type_tag(), items, name, force)
        }
        (
            FieldKind::Dict {
                key_type,
                value_type,
            },
            Value::Dict(entries),
        ) => {
            let key_field = key_type.as_deref().unwrap_or(plain(ScalarType::Text));
            let value_field = value_type.as_deref().unwrap_or(plain(ScalarType::Text));
            encode_dict::<F>(key_field, value_field, entries, name, force)
        }
        (FieldKind::Scalar(_) | FieldKind::Choice(_), _) => {
            let mut node = value_node::<F>(name, value);
            node.text = Some(text_of(field, value)?);
            Ok(node)
        }
        (FieldKind::Object { schema }, _) => Err(Error::Export(format!(
            "`{name}`: values of object fields ({schema}) cannot be represented"
        ))),
        (kind, _) => Err(Error::Export(format!(
            "`{name}`: a {} field cannot hold a {} value",
            kind.field_type(),
            value.type_tag()
        ))),
    }
}

/// Decodes the value of `node`, described by `field`.
///
/// An omitted value decodes to the field's missing value. A text-less
/// scalar node decodes as empty text.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the node records a value type the field does
/// not accept, and [`Error::Value`] if text conversion fails.
pub fn decode<F: Format>(field: &Field, node: &Node) -> Result<Value> {
    let tag = node.attribute(TYPE);
    if tag == Some(Value::MISSING_TAG) {
        return Ok(field.missing_value().clone());
    }
    let expected = match field.kind() {
        FieldKind::Scalar(scalar) => scalar.value_tag(),
        FieldKind::Sequence { kind, .. } => kind.value_tag(),
        FieldKind::Dict { .. } => "dict",
        FieldKind::Choice(_) => "text",
        FieldKind::Object { schema } => {
            return Err(Error::decode(
                &node.name,
                format!("values of object fields ({schema}) cannot be represented"),
            ))
        }
    };
    if let Some(tag) = tag {
        if tag != expected {
            return Err(Error::decode(
                &node.name,
                format!("expected a {expected} value, found {tag}"),
            ));
        }
    }
    match field.kind() {
        FieldKind::Sequence { kind, value_type } => {
            let element = value_type.as_deref().unwrap_or(plain(ScalarType::Text));
            Ok(kind.collect(decode_sequence::<F>(element, node)?))
        }
        FieldKind::Dict {
            key_type,
            value_type,
        } => {
            let key_field = key_type.as_deref().unwrap_or(plain(ScalarType::Text));
            let value_field = value_type.as_deref().unwrap_or(plain(ScalarType::Text));
            Ok(Value::Dict(decode_dict::<F>(key_field, value_field, node)?))
        }
        _ => value_from_text(field, node.text.as_deref().unwrap_or_default()),
    }
}

/// Encodes sequence members, each described by `element`.
pub(crate) fn encode_sequence<F: Format>(
    element: &Field,
    tag: &str,
    items: &[Value],
    name: &str,
    force: bool,
) -> Result<Node> {
    let mut node = Node::new(name);
    if F::TAGGED_VALUES {
        node.set_attribute(TYPE, tag);
    }
    for item in items {
        node.push(encode::<F>(element, item, ELEMENT, force)?);
    }
    Ok(node)
}

/// Encodes dict entries, keys rendered through `key_field`.
pub(crate) fn encode_dict<F: Format>(
    key_field: &Field,
    value_field: &Field,
    entries: &[(Value, Value)],
    name: &str,
    force: bool,
) -> Result<Node> {
    let mut node = Node::new(name);
    if F::TAGGED_VALUES {
        node.set_attribute(TYPE, "dict");
    }
    for (key, item) in entries {
        let mut child = encode::<F>(value_field, item, ELEMENT, force)?;
        child.set_attribute(KEY, text_of(key_field, key)?);
        node.push(child);
    }
    Ok(node)
}

pub(crate) fn decode_sequence<F: Format>(element: &Field, node: &Node) -> Result<Vec<Value>> {
    node.children
        .iter()
        .map(|child| decode::<F>(element, child))
        .collect()
}

pub(crate) fn decode_dict<F: Format>(
    key_field: &Field,
    value_field: &Field,
    node: &Node,
) -> Result<Vec<(Value, Value)>> {
    node.children
        .iter()
        .map(|child| {
            let key = child
                .attribute(KEY)
                .ok_or_else(|| Error::decode(&child.name, "dict entry without a key"))?;
            Ok((
                value_from_text(key_field, key)?,
                decode::<F>(value_field, child)?,
            ))
        })
        .collect()
}

fn omitted(name: &str) -> Node {
    Node::new(name).with_attribute(TYPE, Value::MISSING_TAG)
}

fn value_node<F: Format>(name: &str, value: &Value) -> Node {
    let node = Node::new(name);
    if F::TAGGED_VALUES {
        node.with_attribute(TYPE, value.type_tag())
    } else {
        node
    }
}

/// Renders a scalar or choice value through the field's text conversion.
fn text_of(field: &Field, value: &Value) -> Result<String> {
    match field.kind() {
        FieldKind::Scalar(scalar) => {
            convert::check_syntax(*scalar, value).map_err(|err| Error::Export(err.to_string()))?;
            convert::to_text(*scalar, value)
        }
        FieldKind::Choice(_) => value.as_text().map(str::to_owned).ok_or_else(|| {
            Error::Export(format!(
                "choice values must be text, got {}",
                value.type_tag()
            ))
        }),
        kind => Err(Error::Export(format!(
            "{} values cannot be rendered as text",
            kind.field_type()
        ))),
    }
}

fn value_from_text(field: &Field, text: &str) -> Result<Value> {
    match field.kind() {
        FieldKind::Scalar(scalar) => convert::from_text(*scalar, text),
        FieldKind::Choice(_) => Ok(Value::Text(text.to_owned())),
        kind => Err(Error::Value(format!(
            "{} values cannot be read from text",
            kind.field_type()
        ))),
    }
}
