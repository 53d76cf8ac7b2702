//! Text conversion and validation of field values.
//!
//! Scalars travel through documents as text. [`to_text`] and [`from_text`]
//! are the per-type conversion pair; [`validate`] checks a value against
//! every constraint of a field description, recursing into element, key and
//! value descriptions.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};
use crate::model::field::{Field, FieldKind, ScalarType};
use crate::model::vocabulary::Vocabulary;
use crate::model::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Renders a scalar value as text.
///
/// Text that [`from_text`] would reject is refused here too.
///
/// # Errors
///
/// Returns [`Error::Value`] if `value` is not of `scalar`'s value type,
/// breaks the type's syntax, or if bytes are not valid UTF-8.
pub fn to_text(scalar: ScalarType, value: &Value) -> Result<String> {
    check_tag(scalar, value)?;
    check_syntax(scalar, value)?;
    Ok(match value {
        Value::Bool(true) => "True".to_owned(),
        Value::Bool(false) => "False".to_owned(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Decimal(text) | Value::Text(text) => text.clone(),
        Value::Bytes(bytes) => String::from_utf8(bytes.clone())
            .map_err(|_| Error::Value(format!("{scalar:?} value is not valid UTF-8")))?,
        Value::Date(date) => date.format(DATE_FORMAT).to_string(),
        Value::Datetime(datetime) => datetime.format(DATETIME_FORMAT).to_string(),
        other => {
            return Err(Error::Value(format!(
                "{scalar:?} cannot render a {} value",
                other.type_tag()
            )))
        }
    })
}

/// Parses text into a value of `scalar`'s type, checking the type's syntax.
///
/// # Errors
///
/// Returns [`Error::Value`] if `text` is not a valid rendering.
pub fn from_text(scalar: ScalarType, text: &str) -> Result<Value> {
    let invalid = |what: &str| Error::Value(format!("{text:?} is not a valid {what}"));
    let value = match scalar {
        ScalarType::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Value::Bool(true),
            "false" | "off" | "0" | "" => Value::Bool(false),
            _ => return Err(invalid("boolean")),
        },
        ScalarType::Int => Value::Int(text.trim().parse().map_err(|_| invalid("integer"))?),
        ScalarType::Float => Value::Float(text.trim().parse().map_err(|_| invalid("float"))?),
        ScalarType::Decimal => {
            let text = text.trim();
            if !is_decimal(text) {
                return Err(invalid("decimal"));
            }
            Value::Decimal(text.to_owned())
        }
        ScalarType::Date => Value::Date(
            NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|_| invalid("date"))?,
        ),
        ScalarType::Datetime => Value::Datetime(
            NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
                .map_err(|_| invalid("datetime"))?,
        ),
        ScalarType::Bytes | ScalarType::BytesLine => Value::Bytes(text.as_bytes().to_vec()),
        _ => Value::Text(text.to_owned()),
    };
    check_syntax(scalar, &value)?;
    Ok(value)
}

/// Validates `value` against every constraint of `field`.
///
/// The field's missing value always validates.
///
/// # Errors
///
/// Returns [`Error::Value`] naming the first violated constraint.
pub fn validate(field: &Field, value: &Value) -> Result<()> {
    if value == field.missing_value() {
        return Ok(());
    }
    let label = if field.name().is_empty() {
        field.field_type().tag().to_owned()
    } else {
        format!("field `{}`", field.name())
    };
    match field.kind() {
        FieldKind::Scalar(scalar) => {
            check_tag(*scalar, value)?;
            check_syntax(*scalar, value)?;
            check_bounds(field, value, &label)?;
        }
        FieldKind::Sequence { kind, value_type } => {
            if value.type_tag() != kind.value_tag() {
                return Err(mismatch(&label, kind.value_tag(), value));
            }
            let items = match value {
                Value::List(items) | Value::Tuple(items) | Value::Set(items) => items,
                _ => return Err(mismatch(&label, kind.value_tag(), value)),
            };
            if field.unique {
                for (i, item) in items.iter().enumerate() {
                    if items[..i].contains(item) {
                        return Err(Error::Value(format!("{label} holds {item:?} twice")));
                    }
                }
            }
            if let Some(element) = value_type {
                for item in items {
                    validate(element, item)?;
                }
            }
        }
        FieldKind::Dict {
            key_type,
            value_type,
        } => {
            let Value::Dict(entries) = value else {
                return Err(mismatch(&label, "dict", value));
            };
            let mut seen = HashSet::new();
            for (key, item) in entries {
                if !seen.insert(format!("{key:?}")) {
                    return Err(Error::Value(format!("{label} repeats key {key:?}")));
                }
                if let Some(key_type) = key_type {
                    validate(key_type, key)?;
                }
                if let Some(value_type) = value_type {
                    validate(value_type, item)?;
                }
            }
        }
        FieldKind::Object { .. } => {}
        FieldKind::Choice(choice) => {
            if let Some(Vocabulary::Simple(vocabulary)) = &choice.vocabulary {
                if !vocabulary.contains(value) {
                    return Err(Error::Value(format!(
                        "{label}: {value:?} is not in the vocabulary"
                    )));
                }
            }
        }
    }
    check_length(field, value, &label)
}

fn mismatch(label: &str, expected: &str, value: &Value) -> Error {
    Error::Value(format!(
        "{label} expects a {expected} value, got {}",
        value.type_tag()
    ))
}

fn check_tag(scalar: ScalarType, value: &Value) -> Result<()> {
    if value.type_tag() == scalar.value_tag() {
        Ok(())
    } else {
        Err(mismatch(&format!("{scalar:?}"), scalar.value_tag(), value))
    }
}

pub(crate) fn check_syntax(scalar: ScalarType, value: &Value) -> Result<()> {
    let text = match value {
        Value::Text(text) => text.as_str(),
        Value::Bytes(bytes) => {
            if scalar.is_line() && bytes.iter().any(|b| *b == b'\n' || *b == b'\r') {
                return Err(Error::Value(format!("{scalar:?} value contains a line break")));
            }
            return Ok(());
        }
        _ => return Ok(()),
    };
    if scalar.is_line() && text.contains(['\n', '\r']) {
        return Err(Error::Value(format!("{scalar:?} value contains a line break")));
    }
    let ok = match scalar {
        ScalarType::Ascii | ScalarType::AsciiLine => text.is_ascii(),
        ScalarType::Uri => is_uri(text),
        ScalarType::DottedName | ScalarType::InterfaceField => is_dotted_name(text),
        ScalarType::Id => is_uri(text) || is_dotted_name(text),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::Value(format!("{text:?} is not a valid {scalar:?}")))
    }
}

fn check_bounds(field: &Field, value: &Value, label: &str) -> Result<()> {
    if !field.min().is_none() && value.compare(field.min()) == Some(std::cmp::Ordering::Less) {
        return Err(Error::Value(format!(
            "{label}: {value:?} is below the minimum {:?}",
            field.min()
        )));
    }
    if !field.max().is_none() && value.compare(field.max()) == Some(std::cmp::Ordering::Greater) {
        return Err(Error::Value(format!(
            "{label}: {value:?} is above the maximum {:?}",
            field.max()
        )));
    }
    Ok(())
}

fn check_length(field: &Field, value: &Value, label: &str) -> Result<()> {
    let Some(len) = value.len() else {
        return Ok(());
    };
    let len = u64::try_from(len).unwrap_or(u64::MAX);
    if len < field.min_length() {
        return Err(Error::Value(format!(
            "{label}: length {len} is below {}",
            field.min_length()
        )));
    }
    match field.max_length() {
        Some(max) if len > max => Err(Error::Value(format!(
            "{label}: length {len} is above {max}"
        ))),
        _ => Ok(()),
    }
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (mantissa, exponent) = match digits.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (digits, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = !(whole.is_empty() && fraction.is_empty())
        && all_digits(whole)
        && all_digits(fraction);
    let exponent_ok = exponent.map_or(true, |e| {
        let e = e.strip_prefix(['-', '+']).unwrap_or(e);
        !e.is_empty() && all_digits(e)
    });
    mantissa_ok && exponent_ok
}

fn is_uri(text: &str) -> bool {
    let Some((scheme, rest)) = text.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
        && !rest.chars().any(char::is_whitespace)
}

fn is_dotted_name(text: &str) -> bool {
    !text.is_empty()
        && text.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}
