//! Declarative field and schema descriptions with a lossless textual
//! interchange.
//!
//! The `schema-interchange` crate models schemas as ordered collections of
//! typed, constrained fields and converts them to and from two encodings: a
//! markup tree (XML) and a structured document (JSON). It also merges one
//! schema into another.
//!
//! # Entry Point
//!
//! ```
//! use schema_interchange::{FieldBuilder, FieldType, Model, Schema};
//!
//! let mut schema = Schema::new("");
//! schema.add_field(
//!     FieldBuilder::new(FieldType::TEXT_LINE)
//!         .name("title")
//!         .title("Title")
//!         .build()?,
//! )?;
//! let mut model = Model::new();
//! model.insert(schema);
//!
//! let markup = schema_interchange::to_markup(&model)?;
//! let again = schema_interchange::from_markup(&markup)?;
//! assert_eq!(again.schema().map(|s| s.field_names()), Some(vec!["title"]));
//! # Ok::<(), schema_interchange::Error>(())
//! ```
//!
//! # Encodings
//!
//! Both encodings serialize the same [`Node`] tree, built by a
//! [`Serializer`] from the handlers in a per-encoding [`HandlerRegistry`].
//! [`Markup`] renders it with quick-xml, [`Document`] with serde_json.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod codec;
pub mod error;
pub mod format;
pub mod handler;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod node;
pub mod serializer;

pub use error::{Error, Result};
pub use format::{Document, Format, Markup};
pub use handler::{FieldHandler, HandlerKind, HandlerRegistry, ReadContext};
pub use merge::merge;
pub use metadata::{FieldMetadataHandler, MetadataHandlers, SchemaMetadataHandler};
pub use model::{
    AttrValue, Choice, DefaultFactory, FactoryCapability, FactoryRegistry, Field, FieldBuilder,
    FieldKind, FieldType, Fieldset, FnFactory, Model, ScalarType, Schema, SequenceKind,
    SimpleVocabulary, Term, Value, Vocabulary,
};
pub use node::Node;
#[cfg(feature = "document")]
pub use serializer::document::{from_document, to_document, DocumentOptions};
#[cfg(feature = "markup")]
pub use serializer::markup::{from_markup, to_markup, MarkupOptions};
pub use serializer::Serializer;
