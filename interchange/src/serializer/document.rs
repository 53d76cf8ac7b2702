//! The structured-document (JSON) rendering.
//!
//! The document keeps a fixed scaffold around the schemas:
//!
//! ```json
//! {
//!   "id": "urn:schema-interchange:model",
//!   "$schema": "http://json-schema.org/draft-04/schema#",
//!   "description": "",
//!   "type": "object",
//!   "required": [],
//!   "namespaces": { "i18n": "http://xml.zope.org/namespaces/i18n" },
//!   "properties": {
//!     "schemas": {
//!       "default": { "name": "default", "class": "", "fields": [] }
//!     }
//!   }
//! }
//! ```
//!
//! Inside a field object, node attributes are string members, node text is
//! `value`, sequence members and dict entries are the `values` array, and
//! every other child node is a nested object keyed by its name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::codec::ELEMENT;
use crate::error::{Error, Result};
use crate::format::Document;
use crate::metadata::MODEL_NAMESPACE;
use crate::model::Model;
use crate::node::Node;
use crate::serializer::{Serializer, BASED_ON, FIELD, FIELDSET, INVARIANT, MODEL, SCHEMA};

/// Meta-schema the scaffold declares.
pub const META_SCHEMA: &str = "http://json-schema.org/draft-04/schema#";

/// Key of the default schema.
pub const DEFAULT_SCHEMA: &str = "default";

const VALUE: &str = "value";
const VALUES: &str = "values";

/// Members of a schema entry that metadata may not take over.
const ENTRY_MEMBERS: [&str; 6] = ["name", "class", BASED_ON, "fields", "fieldsets", "invariants"];

/// Layout of rendered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Whether to indent the output.
    pub pretty: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Serializes `model` to a structured document with the standard handlers.
///
/// # Errors
///
/// See [`Serializer::write_tree`].
pub fn to_document(model: &Model) -> Result<String> {
    Serializer::<Document>::new().write_document(model, DocumentOptions::default())
}

/// Parses a model from a structured document with the standard handlers.
///
/// # Errors
///
/// See [`Serializer::read_tree`]; invalid JSON is an [`Error::Document`].
pub fn from_document(text: &str) -> Result<Model> {
    Serializer::<Document>::new().read_document(text)
}

impl<'r> Serializer<'r, Document> {
    /// Serializes `model` to a structured document.
    ///
    /// # Errors
    ///
    /// See [`Serializer::write_tree`].
    pub fn write_document(&self, model: &Model, options: DocumentOptions) -> Result<String> {
        let document = to_json(&self.write_tree(model)?)?;
        let text = if options.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(text)
    }

    /// Parses a model from a structured document.
    ///
    /// # Errors
    ///
    /// See [`Serializer::read_tree`]; invalid JSON is an [`Error::Document`].
    pub fn read_document(&self, text: &str) -> Result<Model> {
        let document: JsonValue = serde_json::from_str(text)?;
        self.read_tree(&from_json(&document)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Scaffold {
    #[serde(default)]
    id: String,
    #[serde(rename = "$schema", default)]
    meta_schema: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    namespaces: BTreeMap<String, String>,
    properties: Properties,
    #[serde(flatten)]
    extra: Map<String, JsonValue>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Properties {
    #[serde(default)]
    schemas: BTreeMap<String, SchemaEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SchemaEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    class: String,
    #[serde(rename = "based-on", default, skip_serializing_if = "Option::is_none")]
    based_on: Option<String>,
    #[serde(default)]
    fields: Vec<JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fieldsets: Vec<FieldsetEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    invariants: Vec<String>,
    #[serde(flatten)]
    metadata: Map<String, JsonValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldsetEntry {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    fields: Vec<JsonValue>,
}

/// Converts a model tree to its document form.
///
/// # Errors
///
/// Returns [`Error::Export`] if the tree does not have the shape
/// [`Serializer::write_tree`] produces, or if two nodes would land on the
/// same member (the unnamed schema and one named `default`, or repeated
/// child names).
pub fn to_json(root: &Node) -> Result<JsonValue> {
    if root.name != MODEL {
        return Err(Error::Export(format!("cannot render a `{}` node as a document", root.name)));
    }
    let mut scaffold = Scaffold {
        id: MODEL_NAMESPACE.to_owned(),
        meta_schema: META_SCHEMA.to_owned(),
        description: String::new(),
        kind: "object".to_owned(),
        required: Vec::new(),
        namespaces: BTreeMap::new(),
        properties: Properties::default(),
        extra: Map::new(),
    };
    for (name, value) in &root.attributes {
        if name == "xmlns" {
            scaffold.id.clone_from(value);
        } else if let Some(prefix) = name.strip_prefix("xmlns:") {
            scaffold.namespaces.insert(prefix.to_owned(), value.clone());
        } else {
            scaffold.extra.insert(name.clone(), JsonValue::String(value.clone()));
        }
    }
    for schema in root.children_named(SCHEMA) {
        let name = schema.attribute("name").unwrap_or_default();
        let key = if name.is_empty() { DEFAULT_SCHEMA } else { name };
        let entry = schema_entry(schema, key)?;
        if scaffold.properties.schemas.insert(key.to_owned(), entry).is_some() {
            return Err(Error::Export(format!(
                "two schemas share the document key `{key}`"
            )));
        }
    }
    Ok(serde_json::to_value(scaffold)?)
}

fn schema_entry(node: &Node, key: &str) -> Result<SchemaEntry> {
    let mut entry = SchemaEntry {
        name: key.to_owned(),
        class: node.attribute("name").unwrap_or_default().to_owned(),
        based_on: node.attribute(BASED_ON).map(str::to_owned),
        ..SchemaEntry::default()
    };
    for (name, value) in &node.attributes {
        if name != "name" && name != BASED_ON {
            insert_metadata(&mut entry, key, name, JsonValue::String(value.clone()))?;
        }
    }
    for child in &node.children {
        match child.name.as_str() {
            FIELD => entry.fields.push(node_object(child)?),
            FIELDSET => entry.fieldsets.push(FieldsetEntry {
                name: child.attribute("name").unwrap_or_default().to_owned(),
                label: child.attribute("label").map(str::to_owned),
                description: child.attribute("description").map(str::to_owned),
                fields: child
                    .children_named(FIELD)
                    .map(node_object)
                    .collect::<Result<_>>()?,
            }),
            INVARIANT => entry
                .invariants
                .push(child.text.clone().unwrap_or_default()),
            other => insert_metadata(&mut entry, key, other, node_object(child)?)?,
        }
    }
    Ok(entry)
}

fn insert_metadata(
    entry: &mut SchemaEntry,
    key: &str,
    name: &str,
    value: JsonValue,
) -> Result<()> {
    if ENTRY_MEMBERS.contains(&name) {
        return Err(Error::Export(format!(
            "schema `{key}` cannot carry metadata named `{name}`"
        )));
    }
    insert_member(&mut entry.metadata, key, name, value)
}

fn insert_member(
    object: &mut Map<String, JsonValue>,
    owner: &str,
    name: &str,
    value: JsonValue,
) -> Result<()> {
    if object.contains_key(name) {
        return Err(Error::Export(format!("`{owner}` has more than one `{name}` member")));
    }
    object.insert(name.to_owned(), value);
    Ok(())
}

fn node_object(node: &Node) -> Result<JsonValue> {
    let mut object = Map::new();
    for (name, value) in &node.attributes {
        insert_member(&mut object, &node.name, name, JsonValue::String(value.clone()))?;
    }
    if let Some(text) = &node.text {
        insert_member(&mut object, &node.name, VALUE, JsonValue::String(text.clone()))?;
    }
    let mut elements = Vec::new();
    for child in &node.children {
        if child.name == ELEMENT {
            elements.push(node_object(child)?);
        } else {
            insert_member(&mut object, &node.name, &child.name, node_object(child)?)?;
        }
    }
    if !elements.is_empty() {
        insert_member(&mut object, &node.name, VALUES, JsonValue::Array(elements))?;
    }
    Ok(JsonValue::Object(object))
}

/// Converts a document back into a model tree.
///
/// # Errors
///
/// Returns [`Error::Document`] if the scaffold is malformed and
/// [`Error::Import`] if a member has an unexpected shape.
pub fn from_json(document: &JsonValue) -> Result<Node> {
    let scaffold = Scaffold::deserialize(document)?;
    let id = if scaffold.id.is_empty() { MODEL_NAMESPACE } else { &scaffold.id };
    let mut root = Node::new(MODEL).with_attribute("xmlns", id);
    for (prefix, namespace) in &scaffold.namespaces {
        root.set_attribute(format!("xmlns:{prefix}"), namespace);
    }
    for (name, value) in &scaffold.extra {
        root.set_attribute(name, string_member(name, value)?);
    }
    for (key, entry) in &scaffold.properties.schemas {
        root.push(schema_node(key, entry)?);
    }
    Ok(root)
}

fn schema_node(key: &str, entry: &SchemaEntry) -> Result<Node> {
    let name = if !entry.class.is_empty() {
        entry.class.as_str()
    } else if key == DEFAULT_SCHEMA {
        ""
    } else {
        key
    };
    let mut node = Node::new(SCHEMA);
    if !name.is_empty() {
        node.set_attribute("name", name);
    }
    if let Some(bases) = entry.based_on.as_deref().filter(|b| !b.is_empty()) {
        node.set_attribute(BASED_ON, bases);
    }
    for field in &entry.fields {
        node.push(object_node(FIELD, field)?);
    }
    for fieldset in &entry.fieldsets {
        let mut group = Node::new(FIELDSET).with_attribute("name", &fieldset.name);
        if let Some(label) = &fieldset.label {
            group.set_attribute("label", label);
        }
        if let Some(description) = &fieldset.description {
            group.set_attribute("description", description);
        }
        for field in &fieldset.fields {
            group.push(object_node(FIELD, field)?);
        }
        node.push(group);
    }
    for invariant in &entry.invariants {
        node.push(Node::new(INVARIANT).with_text(invariant));
    }
    for (name, value) in &entry.metadata {
        match value {
            JsonValue::Object(_) => node.push(object_node(name, value)?),
            other => node.set_attribute(name, string_member(name, other)?),
        }
    }
    Ok(node)
}

fn object_node(name: &str, value: &JsonValue) -> Result<Node> {
    let JsonValue::Object(object) = value else {
        return Err(Error::Import(format!("`{name}` must be an object")));
    };
    let mut node = Node::new(name);
    for (member, value) in object {
        match (member.as_str(), value) {
            (VALUE, JsonValue::String(text)) => node.text = Some(text.clone()),
            (VALUES, JsonValue::Array(items)) => {
                for item in items {
                    node.push(object_node(ELEMENT, item)?);
                }
            }
            (_, JsonValue::Object(_)) => node.push(object_node(member, value)?),
            (_, other) => node.set_attribute(member, string_member(member, other)?),
        }
    }
    Ok(node)
}

fn string_member(name: &str, value: &JsonValue) -> Result<String> {
    match value {
        JsonValue::String(text) => Ok(text.clone()),
        other => Err(Error::Import(format!(
            "`{name}` must be a string, found {other}"
        ))),
    }
}
