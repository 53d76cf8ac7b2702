//! Field values.
//!
//! A [`Value`] is what a field holds at runtime and what its `default`,
//! `missing_value`, `min` and `max` attributes carry. Every variant has a
//! stable value type tag that the structured-document encoding records next
//! to the payload.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value. The default missing value of every field.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A binary floating point number.
    Float(f64),
    /// A decimal number kept in its canonical textual form.
    Decimal(String),
    /// Unicode text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A calendar date.
    Date(NaiveDate),
    /// A date and time without time zone.
    Datetime(NaiveDateTime),
    /// An ordered list.
    List(Vec<Value>),
    /// A fixed tuple.
    Tuple(Vec<Value>),
    /// A set; members are unique and kept in insertion order.
    Set(Vec<Value>),
    /// A mapping; entries are kept in insertion order.
    Dict(Vec<(Value, Value)>),
}

impl Value {
    /// Tag recorded for values omitted from a document in favour of the
    /// field's missing value.
    pub const MISSING_TAG: &'static str = "missing";

    /// Returns the value type tag of this value.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Datetime(_) => "datetime",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
        }
    }

    /// Returns `true` for [`Value::None`].
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Returns the text of a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer of a [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Number of members of a sized value: characters for text, bytes for
    /// binary values, entries for collections.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(text) | Value::Decimal(text) => Some(text.chars().count()),
            Value::Bytes(bytes) => Some(bytes.len()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Some(items.len()),
            Value::Dict(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Orders two values of the same orderable kind. Values of different
    /// kinds, and unorderable kinds, compare as `None`.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => {
                let a: f64 = a.parse().ok()?;
                let b: f64 = b.parse().ok()?;
                a.partial_cmp(&b)
            }
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Datetime(a), Value::Datetime(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_are_distinct() {
        let values = [
            Value::None,
            Value::Bool(true),
            Value::Int(1),
            Value::Float(1.0),
            Value::Decimal("1.0".into()),
            Value::Text("a".into()),
            Value::Bytes(vec![1]),
            Value::List(vec![]),
            Value::Tuple(vec![]),
            Value::Set(vec![]),
            Value::Dict(vec![]),
        ];
        let mut tags = std::collections::HashSet::new();
        for value in &values {
            assert!(tags.insert(value.type_tag()), "duplicate tag {}", value.type_tag());
        }
        assert!(!tags.contains(Value::MISSING_TAG));
    }

    #[test]
    fn compare_only_within_a_kind() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(
            Value::Decimal("10.5".into()).compare(&Value::Decimal("9".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).compare(&Value::Float(1.0)), None);
    }

    #[test]
    fn option_converts_to_none() {
        assert_eq!(Value::from(None::<i64>), Value::None);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
