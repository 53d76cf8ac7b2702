//! Vocabulary handling of choice fields.
//!
//! Only two vocabulary shapes can be written: a name, resolved by the host,
//! and a simple term list whose tokens are the escaped values. A term list
//! with labels is written as a keyed mapping, value to label; without
//! labels, as a plain list.

use crate::codec;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::model::field::plain;
use crate::model::{
    escape_token, Choice, ScalarType, SimpleVocabulary, Term, Value, Vocabulary,
};
use crate::node::Node;

/// Writes the `vocabulary` or `values` node of a choice field.
pub(super) fn write_vocabulary<F: Format>(choice: &Choice) -> Result<Node> {
    match (&choice.vocabulary_name, &choice.vocabulary) {
        (Some(name), None) => codec::encode::<F>(
            plain(ScalarType::TextLine),
            &Value::Text(name.clone()),
            "vocabulary",
            true,
        ),
        (None, Some(Vocabulary::Simple(vocabulary))) => write_values::<F>(vocabulary),
        (_, Some(other)) => Err(Error::Export(format!(
            "choice fields with vocabularies not based on a simple list of values \
             or a named vocabulary cannot be exported ({other:?})"
        ))),
        (None, None) => Err(Error::Export(
            "choice field has neither a vocabulary nor a vocabulary name".to_owned(),
        )),
    }
}

fn write_values<F: Format>(vocabulary: &SimpleVocabulary) -> Result<Node> {
    let mut entries: Vec<(String, Option<String>)> = Vec::new();
    for term in vocabulary.terms() {
        let value = match term.value() {
            Value::Text(value) if term.token() == escape_token(value) => value,
            _ => {
                return Err(Error::Export(format!(
                    "cannot export a vocabulary that is not based on a simple list of \
                     values (term {:?} with token {:?})",
                    term.value(),
                    term.token()
                )))
            }
        };
        let label = term
            .title()
            .filter(|title| !title.is_empty() && title != value)
            .map(str::to_owned);
        entries.push((value.clone(), label));
    }

    if entries.iter().any(|(_, label)| label.is_some()) {
        let pairs: Vec<(Value, Value)> = entries
            .into_iter()
            .map(|(value, label)| {
                let label = label.unwrap_or_else(|| value.clone());
                (Value::Text(value), Value::Text(label))
            })
            .collect();
        codec::encode_dict::<F>(
            plain(ScalarType::Text),
            plain(ScalarType::Text),
            &pairs,
            "values",
            true,
        )
    } else {
        let items: Vec<Value> = entries.into_iter().map(|(value, _)| Value::Text(value)).collect();
        codec::encode_sequence::<F>(plain(ScalarType::Text), "list", &items, "values", true)
    }
}

/// Reads a `values` node into a simple vocabulary. Any keyed child selects
/// the labelled form.
pub(super) fn read_values<F: Format>(node: &Node) -> Result<Vocabulary> {
    let labelled = node.children.iter().any(|child| child.attribute(codec::KEY).is_some());
    let entries: Vec<(Value, Option<Value>)> = if labelled {
        codec::decode_dict::<F>(plain(ScalarType::Text), plain(ScalarType::Text), node)?
            .into_iter()
            .map(|(value, label)| (value, Some(label)))
            .collect()
    } else {
        codec::decode_sequence::<F>(plain(ScalarType::Text), node)?
            .into_iter()
            .map(|value| (value, None))
            .collect()
    };

    let mut terms = Vec::with_capacity(entries.len());
    for (value, label) in entries {
        let value = match value {
            Value::Text(value) => value,
            Value::None => String::new(),
            other => {
                return Err(Error::decode(
                    &node.name,
                    format!("choice values must be text, got {}", other.type_tag()),
                ))
            }
        };
        // A label equal to its value stands for a bare term.
        let label = match label {
            Some(Value::Text(label)) if label != value => Some(label),
            _ => None,
        };
        let token = escape_token(&value);
        let term = if token == value {
            Term::new(value)
        } else {
            Term::tokenized(value, token)
        };
        terms.push(match label {
            Some(label) => term.with_title(label),
            None => term,
        });
    }
    Ok(Vocabulary::Simple(SimpleVocabulary::new(terms)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Document, Markup};

    fn simple(terms: Vec<Term>) -> Choice {
        Choice {
            vocabulary_name: None,
            vocabulary: Some(Vocabulary::Simple(SimpleVocabulary::new(terms).unwrap())),
        }
    }

    #[test]
    fn bare_values_write_a_plain_list() {
        let choice = simple(vec![Term::new("a"), Term::new("b")]);
        let node = write_vocabulary::<Markup>(&choice).unwrap();
        assert_eq!(node.name, "values");
        assert!(node.children.iter().all(|c| c.attribute(codec::KEY).is_none()));
        assert_eq!(read_values::<Markup>(&node).unwrap(), choice.vocabulary.unwrap());
    }

    #[test]
    fn any_label_switches_to_the_keyed_form() {
        let choice = simple(vec![Term::new("a"), Term::new("b").with_title("Bee")]);
        let node = write_vocabulary::<Document>(&choice).unwrap();
        assert_eq!(node.attribute(codec::TYPE), Some("dict"));
        assert_eq!(node.children[0].attribute(codec::KEY), Some("a"));
        assert_eq!(node.children[0].text.as_deref(), Some("a"));
        assert_eq!(node.children[1].text.as_deref(), Some("Bee"));

        let Vocabulary::Simple(read) = read_values::<Document>(&node).unwrap() else {
            panic!("expected a simple vocabulary");
        };
        assert_eq!(read.by_token("b").unwrap().title(), Some("Bee"));
    }

    #[test]
    fn escaped_values_get_explicit_tokens() {
        let choice = simple(vec![Term::tokenized("caf\u{e9}", "caf\\xe9")]);
        let node = write_vocabulary::<Markup>(&choice).unwrap();
        assert_eq!(node.children[0].text.as_deref(), Some("caf\u{e9}"));
        let Vocabulary::Simple(read) = read_values::<Markup>(&node).unwrap() else {
            panic!("expected a simple vocabulary");
        };
        assert_eq!(read.terms()[0].token(), "caf\\xe9");
        assert_eq!(read.terms()[0].value(), &Value::from("caf\u{e9}"));
    }

    #[test]
    fn named_vocabulary_is_forced() {
        let choice = Choice {
            vocabulary_name: Some("pkg.colors".into()),
            vocabulary: None,
        };
        let node = write_vocabulary::<Markup>(&choice).unwrap();
        assert_eq!(node, Node::new("vocabulary").with_text("pkg.colors"));
    }

    #[test]
    fn unrepresentable_vocabularies_are_export_errors() {
        let mismatched = simple(vec![Term::tokenized("a", "token-a")]);
        assert!(matches!(write_vocabulary::<Markup>(&mismatched), Err(Error::Export(_))));
        let numeric = simple(vec![Term::new(1)]);
        assert!(matches!(write_vocabulary::<Markup>(&numeric), Err(Error::Export(_))));
        let dynamic = Choice {
            vocabulary_name: None,
            vocabulary: Some(Vocabulary::Dynamic("pkg.catalog".into())),
        };
        assert!(matches!(write_vocabulary::<Document>(&dynamic), Err(Error::Export(_))));
        let binder = Choice {
            vocabulary_name: None,
            vocabulary: Some(Vocabulary::SourceBinder("pkg.source".into())),
        };
        assert!(matches!(write_vocabulary::<Markup>(&binder), Err(Error::Export(_))));
    }
}
