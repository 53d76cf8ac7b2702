//! Vocabularies backing choice fields, and the token escaping scheme.
//!
//! A token is the interchange-safe stand-in for a term value. Values made of
//! printable ASCII are their own token; anything else is escaped with
//! [`escape_token`], which is reversed exactly by [`unescape_token`].

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::model::Value;

/// Escapes `value` into a token.
///
/// Backslash, tab, newline and carriage return get their short escapes,
/// other control characters and non-ASCII characters become `\xNN`,
/// `\uNNNN` or `\UNNNNNNNN` (lowercase hex).
#[must_use]
pub fn escape_token(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        let code = u32::from(c);
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(c),
            _ if code <= 0xff => {
                let _ = write!(out, "\\x{code:02x}");
            }
            _ if code <= 0xffff => {
                let _ = write!(out, "\\u{code:04x}");
            }
            _ => {
                let _ = write!(out, "\\U{code:08x}");
            }
        }
    }
    out
}

/// Reverses [`escape_token`].
///
/// # Errors
///
/// Returns [`Error::Value`] for a truncated or unknown escape sequence.
pub fn unescape_token(token: &str) -> Result<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let width = match chars.next() {
            Some('\\') => {
                out.push('\\');
                continue;
            }
            Some('t') => {
                out.push('\t');
                continue;
            }
            Some('n') => {
                out.push('\n');
                continue;
            }
            Some('r') => {
                out.push('\r');
                continue;
            }
            Some('x') => 2,
            Some('u') => 4,
            Some('U') => 8,
            other => {
                return Err(Error::Value(format!(
                    "invalid escape `\\{}` in token {token:?}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        };
        let digits: String = chars.by_ref().take(width).collect();
        let decoded = (digits.len() == width)
            .then(|| u32::from_str_radix(&digits, 16).ok())
            .flatten()
            .and_then(char::from_u32)
            .ok_or_else(|| {
                Error::Value(format!("invalid escape `\\{digits}` in token {token:?}"))
            })?;
        out.push(decoded);
    }
    Ok(out)
}

/// One permitted value of a vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    value: Value,
    token: String,
    title: Option<String>,
}

impl Term {
    /// A term whose token is the value's own text.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        let token = match &value {
            Value::Text(text) | Value::Decimal(text) => text.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Float(f) => f.to_string(),
            other => format!("{other:?}"),
        };
        Self {
            value,
            token,
            title: None,
        }
    }

    /// A term with an explicit token.
    #[must_use]
    pub fn tokenized(value: impl Into<Value>, token: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            token: token.into(),
            title: None,
        }
    }

    /// Sets the human-readable label.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The term's value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The term's token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The term's label, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

/// An ordered list of terms in which tokens and values are both unique.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleVocabulary {
    terms: Vec<Term>,
}

impl SimpleVocabulary {
    /// Builds a vocabulary from `terms`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if two terms share a value or a token.
    pub fn new(terms: Vec<Term>) -> Result<Self> {
        let mut tokens = HashSet::new();
        for (i, term) in terms.iter().enumerate() {
            if !tokens.insert(term.token.as_str()) {
                return Err(Error::Value(format!("duplicate vocabulary token {:?}", term.token)));
            }
            if terms[..i].iter().any(|t| t.value == term.value) {
                return Err(Error::Value(format!(
                    "duplicate vocabulary value {:?}",
                    term.value
                )));
            }
        }
        Ok(Self { terms })
    }

    /// Builds a vocabulary of bare values; each value is its own token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] on duplicate values.
    pub fn from_values<I, V>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(values.into_iter().map(Term::new).collect())
    }

    /// The terms, in order.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Looks a term up by token.
    #[must_use]
    pub fn by_token(&self, token: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.token == token)
    }

    /// Looks a term up by value.
    #[must_use]
    pub fn by_value(&self, value: &Value) -> Option<&Term> {
        self.terms.iter().find(|t| &t.value == value)
    }

    /// Returns `true` if `value` is one of the terms' values.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.by_value(value).is_some()
    }
}

/// The resolved vocabulary object bound to a choice field.
#[derive(Debug, Clone, PartialEq)]
pub enum Vocabulary {
    /// A literal, tokenized term list.
    Simple(SimpleVocabulary),
    /// Any other vocabulary implementation, identified for diagnostics.
    Dynamic(String),
    /// A source binder computing the vocabulary per context, by dotted name.
    SourceBinder(String),
}
