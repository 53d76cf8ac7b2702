//! The two concrete encodings.
//!
//! Each encoding has its own process-wide [`HandlerRegistry`], built once on
//! first use and read-only afterwards.

use std::sync::OnceLock;

use crate::handler::HandlerRegistry;

/// A concrete textual encoding of schemas.
pub trait Format: Sized + Send + Sync + 'static {
    /// Human-readable name, used in diagnostics.
    const NAME: &'static str;

    /// Whether every value node records the type of its value. When unset,
    /// only values omitted in favour of the missing value are tagged.
    const TAGGED_VALUES: bool;

    /// The process-wide registry with a handler for every built-in field
    /// type.
    fn registry() -> &'static HandlerRegistry<Self>;
}

/// The markup-tree (XML) encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markup;

/// The structured-document (JSON) encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Document;

impl Format for Markup {
    const NAME: &'static str = "markup";
    const TAGGED_VALUES: bool = false;

    fn registry() -> &'static HandlerRegistry<Self> {
        static REGISTRY: OnceLock<HandlerRegistry<Markup>> = OnceLock::new();
        REGISTRY.get_or_init(HandlerRegistry::standard)
    }
}

impl Format for Document {
    const NAME: &'static str = "document";
    const TAGGED_VALUES: bool = true;

    fn registry() -> &'static HandlerRegistry<Self> {
        static REGISTRY: OnceLock<HandlerRegistry<Document>> = OnceLock::new();
        REGISTRY.get_or_init(HandlerRegistry::standard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    #[test]
    fn registries_are_built_once_per_format() {
        assert!(std::ptr::eq(Markup::registry(), Markup::registry()));
        assert!(Markup::registry().lookup(FieldType::Dict).is_some());
        assert!(Document::registry().lookup_tag("Choice").is_some());
    }
}
