//! Error taxonomy shared by the codec, the handlers, the serializers and the
//! merger.
//!
//! Nothing in this crate retries: every error is returned to the immediate
//! caller of the failing operation.

use thiserror::Error;

/// Errors produced while converting schemas to or from their textual forms.
#[derive(Debug, Error)]
pub enum Error {
    /// A value or field cannot be represented in the target encoding.
    #[error("export error: {0}")]
    Export(String),

    /// A document violates a structural contract of the encoding.
    #[error("import error: {0}")]
    Import(String),

    /// A node records a value type that the describing field does not accept.
    #[error("cannot decode `{node}`: {message}")]
    Decode {
        /// Name of the offending node.
        node: String,
        /// What was wrong with it.
        message: String,
    },

    /// The field/schema system rejected a value or an attribute set.
    #[error("{0}")]
    Value(String),

    /// The markup text is not well-formed.
    #[cfg(feature = "markup")]
    #[error("malformed markup: {0}")]
    Markup(#[from] quick_xml::Error),

    /// A markup attribute is not well-formed.
    #[cfg(feature = "markup")]
    #[error("malformed markup attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Writing the rendered output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The structured document is not valid JSON or has the wrong shape.
    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),
}

impl Error {
    /// Builds an [`Error::Decode`] for the node called `node`.
    pub(crate) fn decode(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
