//! The in-memory field and schema model.
//!
//! This is the part of the system the encodings describe: values, field
//! descriptions and their construction, vocabularies, default factories,
//! schemas and models.

pub mod builder;
pub mod convert;
pub mod factory;
pub mod field;
pub mod order;
pub mod schema;
pub mod value;
pub mod vocabulary;

pub use builder::{AttrValue, FieldBuilder, PendingField};
pub use factory::{DefaultFactory, FactoryCapability, FactoryRegistry, FnFactory};
pub use field::{AttrRef, Choice, Field, FieldKind, FieldType, ScalarType, SequenceKind};
pub use schema::{Fieldset, Model, Schema};
pub use value::Value;
pub use vocabulary::{escape_token, unescape_token, SimpleVocabulary, Term, Vocabulary};
