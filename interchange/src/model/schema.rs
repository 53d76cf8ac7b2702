//! Schemas and models.
//!
//! A [`Schema`] owns its fields through shared references so that merging
//! can hand the very same field, ordering integer included, to another
//! schema. Fields are always listed by ordering integer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};
use crate::model::field::Field;

/// A named presentation grouping of some of a schema's own fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fieldset {
    /// Identifier of the fieldset, unique within its schema.
    pub name: String,
    /// Optional human-readable label.
    pub label: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Member field names, in presentation order.
    pub fields: Vec<String>,
}

impl Fieldset {
    /// A fieldset without label or description.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            label: None,
            description: None,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An ordered, inheritable collection of fields plus tagged metadata.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    name: String,
    fields: BTreeMap<String, Arc<Field>>,
    bases: Vec<Arc<Schema>>,
    tagged_values: BTreeMap<String, JsonValue>,
    fieldsets: Vec<Fieldset>,
    invariants: Vec<String>,
}

impl Schema {
    /// An empty schema. The name doubles as the identifier bases are
    /// referenced by; the default schema of a model has an empty name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The schema's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the field has no name, or if the name is
    /// already used by this schema or one of its bases.
    pub fn add_field(&mut self, field: Field) -> Result<Arc<Field>> {
        if field.name().is_empty() {
            return Err(Error::Value(format!(
                "schema {:?}: fields need a name",
                self.name
            )));
        }
        if self.lookup(field.name()).is_some() {
            return Err(Error::Value(format!(
                "schema {:?} already has a field named {:?}",
                self.name,
                field.name()
            )));
        }
        let field = Arc::new(field);
        self.fields
            .insert(field.name().to_owned(), Arc::clone(&field));
        Ok(field)
    }

    /// Inserts a shared field, replacing any own field of the same name.
    pub(crate) fn put_field(&mut self, field: Arc<Field>) {
        self.fields.insert(field.name().to_owned(), field);
    }

    /// Removes an own field.
    pub(crate) fn remove_field(&mut self, name: &str) -> Option<Arc<Field>> {
        self.fields.remove(name)
    }

    /// Returns an own field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields.get(name)
    }

    /// Returns a field, own or inherited.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Arc<Field>> {
        self.resolution_order()
            .into_iter()
            .find_map(|schema| schema.fields.get(name))
    }

    /// Own fields, by ordering integer.
    #[must_use]
    pub fn fields(&self) -> Vec<&Arc<Field>> {
        let mut fields: Vec<&Arc<Field>> = self.fields.values().collect();
        fields.sort_by_key(|field| field.order());
        fields
    }

    /// Own field names, by ordering integer.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields().into_iter().map(|field| field.name()).collect()
    }

    /// Own and inherited field names, by ordering integer.
    #[must_use]
    pub fn field_names_in_order(&self) -> Vec<&str> {
        let mut fields: Vec<&Arc<Field>> = Vec::new();
        for schema in self.resolution_order() {
            for field in schema.fields.values() {
                if !fields.iter().any(|f| f.name() == field.name()) {
                    fields.push(field);
                }
            }
        }
        fields.sort_by_key(|field| field.order());
        fields.into_iter().map(|field| field.name()).collect()
    }

    /// Direct bases, in declaration order.
    #[must_use]
    pub fn bases(&self) -> &[Arc<Schema>] {
        &self.bases
    }

    /// Replaces the direct bases.
    pub fn set_bases(&mut self, bases: Vec<Arc<Schema>>) {
        self.bases = bases;
    }

    /// Appends a direct base.
    pub fn add_base(&mut self, base: Arc<Schema>) {
        self.bases.push(base);
    }

    /// This schema followed by its bases, most specific first, each schema
    /// once. A schema reachable along several paths is placed at its last
    /// position in the depth-first walk, behind everything that extends it.
    #[must_use]
    pub fn resolution_order(&self) -> Vec<&Schema> {
        let mut walk: Vec<&Schema> = vec![self];
        for base in &self.bases {
            walk.extend(base.resolution_order());
        }
        walk.iter()
            .enumerate()
            .filter(|(i, schema)| !walk[i + 1..].iter().any(|s| std::ptr::eq(*s, **schema)))
            .map(|(_, schema)| *schema)
            .collect()
    }

    /// Whether `other` is this schema or one of its ancestors.
    #[must_use]
    pub fn extends(&self, other: &Schema) -> bool {
        self.resolution_order()
            .into_iter()
            .any(|schema| std::ptr::eq(schema, other))
    }

    /// Own tagged values.
    #[must_use]
    pub fn tagged_values(&self) -> &BTreeMap<String, JsonValue> {
        &self.tagged_values
    }

    /// Returns an own tagged value.
    #[must_use]
    pub fn tagged_value(&self, key: &str) -> Option<&JsonValue> {
        self.tagged_values.get(key)
    }

    /// Returns the most specific tagged value along the resolution order.
    #[must_use]
    pub fn query_tagged_value(&self, key: &str) -> Option<&JsonValue> {
        self.resolution_order()
            .into_iter()
            .find_map(|schema| schema.tagged_values.get(key))
    }

    /// Sets an own tagged value, returning the previous one.
    pub fn set_tagged_value(
        &mut self,
        key: impl Into<String>,
        value: JsonValue,
    ) -> Option<JsonValue> {
        self.tagged_values.insert(key.into(), value)
    }

    /// Concatenates the list-valued tagged value `key` of every schema in
    /// the resolution order, least specific first. Non-list values count as
    /// one-element lists.
    #[must_use]
    pub fn merged_tagged_value_list(&self, key: &str) -> Vec<JsonValue> {
        let mut merged = Vec::new();
        for schema in self.resolution_order().into_iter().rev() {
            match schema.tagged_values.get(key) {
                Some(JsonValue::Array(items)) => merged.extend(items.iter().cloned()),
                Some(other) => merged.push(other.clone()),
                None => {}
            }
        }
        merged
    }

    /// Merges the object-valued tagged value `key` of every schema in the
    /// resolution order, least specific first, so that more specific entries
    /// win. Non-object values are ignored.
    #[must_use]
    pub fn merged_tagged_value_dict(&self, key: &str) -> Map<String, JsonValue> {
        let mut merged = Map::new();
        for schema in self.resolution_order().into_iter().rev() {
            if let Some(JsonValue::Object(entries)) = schema.tagged_values.get(key) {
                for (k, v) in entries {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        merged
    }

    /// Fieldsets, in declaration order.
    #[must_use]
    pub fn fieldsets(&self) -> &[Fieldset] {
        &self.fieldsets
    }

    /// Adds a fieldset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the name is taken, a member is not an own
    /// field, or a member already belongs to another fieldset.
    pub fn add_fieldset(&mut self, fieldset: Fieldset) -> Result<()> {
        if self.fieldsets.iter().any(|f| f.name == fieldset.name) {
            return Err(Error::Value(format!(
                "schema {:?} already has a fieldset named {:?}",
                self.name, fieldset.name
            )));
        }
        for member in &fieldset.fields {
            if !self.fields.contains_key(member) {
                return Err(Error::Value(format!(
                    "fieldset {:?} names unknown field {member:?}",
                    fieldset.name
                )));
            }
            if self.fieldset_of(member).is_some() {
                return Err(Error::Value(format!(
                    "field {member:?} already belongs to fieldset {:?}",
                    self.fieldset_of(member).map(|f| f.name.as_str()).unwrap_or_default()
                )));
            }
        }
        self.fieldsets.push(fieldset);
        Ok(())
    }

    /// The fieldset `field` belongs to, if any.
    #[must_use]
    pub fn fieldset_of(&self, field: &str) -> Option<&Fieldset> {
        self.fieldsets
            .iter()
            .find(|fieldset| fieldset.fields.iter().any(|f| f == field))
    }

    pub(crate) fn fieldsets_mut(&mut self) -> &mut Vec<Fieldset> {
        &mut self.fieldsets
    }

    /// Invariant references, by dotted name.
    #[must_use]
    pub fn invariants(&self) -> &[String] {
        &self.invariants
    }

    /// Adds an invariant reference; repeated references are ignored.
    pub fn add_invariant(&mut self, invariant: impl Into<String>) {
        let invariant = invariant.into();
        if !self.invariants.contains(&invariant) {
            self.invariants.push(invariant);
        }
    }

    pub(crate) fn invariants_mut(&mut self) -> &mut Vec<String> {
        &mut self.invariants
    }
}

/// A set of schemas keyed by name; the empty name is the default schema.
#[derive(Debug, Clone, Default)]
pub struct Model {
    schemata: BTreeMap<String, Arc<Schema>>,
}

impl Model {
    /// An empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `schema` under its own name, replacing any previous one.
    pub fn insert(&mut self, schema: Schema) -> Arc<Schema> {
        self.insert_shared(Arc::new(schema))
    }

    /// Adds a shared schema under its own name, replacing any previous one.
    pub fn insert_shared(&mut self, schema: Arc<Schema>) -> Arc<Schema> {
        self.schemata
            .insert(schema.name().to_owned(), Arc::clone(&schema));
        schema
    }

    /// Returns a schema by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemata.get(name)
    }

    /// Returns a schema by name for modification, cloning it first if it is
    /// shared.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemata.get_mut(name).map(Arc::make_mut)
    }

    /// The default schema.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.get("")
    }

    /// Schemas, by name.
    pub fn schemata(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemata.values()
    }

    /// Number of schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemata.len()
    }

    /// Whether the model has no schemas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemata.is_empty()
    }
}
