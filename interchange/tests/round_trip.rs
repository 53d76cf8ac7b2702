//! Whole-model round trips through both encodings.
//!
//! Every built-in field type is written with a representative set of
//! attributes and read back; the read model must describe the same fields.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use schema_interchange::codec::{decode, encode};
use schema_interchange::metadata::I18N_NAMESPACE;
use schema_interchange::{
    from_document, from_markup, to_document, to_markup, Document, DocumentOptions, Error, Field,
    FieldBuilder, FieldKind, FieldMetadataHandler, FieldType, Fieldset, Markup, MetadataHandlers,
    Model, Node, ScalarType, Schema, SequenceKind, Serializer, SimpleVocabulary, Term, Value,
    Vocabulary,
};

// =============================================================================
// Fixtures
// =============================================================================

fn scalar(scalar: ScalarType) -> FieldBuilder {
    FieldBuilder::new(FieldType::Scalar(scalar))
}

fn line() -> Field {
    scalar(ScalarType::TextLine).build().unwrap()
}

fn int() -> Field {
    FieldBuilder::new(FieldType::INT).build().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn every_field_type() -> Vec<Field> {
    let timestamp = date(2024, 1, 2).and_hms_milli_opt(3, 4, 5, 600).unwrap();
    let colors = SimpleVocabulary::new(vec![
        Term::new("red"),
        Term::new("green").with_title("Green"),
        Term::tokenized("cr\u{e8}me", "cr\\xe8me"),
    ])
    .unwrap();

    let fields = vec![
        scalar(ScalarType::Bytes)
            .name("bytes")
            .default(Value::Bytes(b"raw".to_vec()))
            .max_length(10),
        scalar(ScalarType::BytesLine)
            .name("bytes_line")
            .default(Value::Bytes(b"one line".to_vec())),
        scalar(ScalarType::Ascii).name("ascii").default("plain\ntext"),
        scalar(ScalarType::AsciiLine).name("ascii_line").min_length(1),
        scalar(ScalarType::Text)
            .name("body")
            .title("Body")
            .description("Main text & <markup>")
            .default("first\nsecond"),
        scalar(ScalarType::TextLine)
            .name("title")
            .title("Title")
            .required(false)
            .readonly(true),
        scalar(ScalarType::Password).name("password").max_length(64),
        scalar(ScalarType::SourceText).name("source").default("x = 1\n"),
        scalar(ScalarType::Uri).name("homepage").default("http://example.com/a?b=c"),
        scalar(ScalarType::Id).name("id").default("pkg.thing"),
        scalar(ScalarType::DottedName).name("dotted").default("pkg.module"),
        scalar(ScalarType::InterfaceField).name("iface").default("pkg.IThing"),
        FieldBuilder::new(FieldType::BOOL).name("flag").default(true),
        FieldBuilder::new(FieldType::INT)
            .name("count")
            .min(1)
            .max(10)
            .default(5),
        FieldBuilder::new(FieldType::INT).name("sentinel").missing_value(-1),
        FieldBuilder::new(FieldType::FLOAT).name("ratio").min(0.0).default(2.5),
        scalar(ScalarType::Decimal)
            .name("price")
            .default(Value::Decimal("3.14".into())),
        scalar(ScalarType::Datetime)
            .name("stamp")
            .default(Value::Datetime(timestamp)),
        scalar(ScalarType::Date)
            .name("day")
            .min(Value::Date(date(2000, 1, 1)))
            .default(Value::Date(date(2024, 2, 29))),
        FieldBuilder::new(FieldType::LIST)
            .name("numbers")
            .value_type(int())
            .min_length(1)
            .max_length(3)
            .default(Value::List(vec![1.into(), 2.into()])),
        FieldBuilder::new(FieldType::Sequence(SequenceKind::Tuple))
            .name("pair")
            .value_type(line())
            .default(Value::Tuple(vec!["x".into(), "y".into()])),
        FieldBuilder::new(FieldType::SET)
            .name("tags")
            .value_type(line())
            .default(Value::Set(vec!["b".into(), "a".into()])),
        FieldBuilder::new(FieldType::Sequence(SequenceKind::FrozenSet))
            .name("frozen")
            .default(Value::Set(vec!["z".into()])),
        FieldBuilder::new(FieldType::Dict)
            .name("scores")
            .key_type(line())
            .value_type(int())
            .default(Value::Dict(vec![("b".into(), 2.into()), ("a".into(), 1.into())])),
        FieldBuilder::new(FieldType::Object).name("address").schema("pkg.IAddress"),
        FieldBuilder::new(FieldType::Choice)
            .name("color")
            .vocabulary(Vocabulary::Simple(colors))
            .default("green"),
        FieldBuilder::new(FieldType::Choice)
            .name("country")
            .vocabulary_name("pkg.countries"),
    ];
    fields.into_iter().map(|builder| builder.build().unwrap()).collect()
}

// Fieldset members are written after the other fields and read back in
// that order, so the sample groups the last fields it defines.
fn sample_model() -> Model {
    let mut base = Schema::new("pkg.IBase");
    base.add_field(scalar(ScalarType::TextLine).name("base").build().unwrap())
        .unwrap();
    let mut model = Model::new();
    let base = model.insert(base);

    let mut schema = Schema::new("");
    schema.add_base(base);
    for field in every_field_type() {
        schema.add_field(field).unwrap();
    }
    schema
        .add_fieldset(
            Fieldset::new("choices", ["color", "country"])
                .with_label("Choices")
                .with_description("Picked from vocabularies"),
        )
        .unwrap();
    schema.add_invariant("pkg.invariants.consistent");
    model.insert(schema);
    model
}

// =============================================================================
// Comparison
// =============================================================================

fn assert_same_field(expected: &Field, actual: &Field) {
    let name = expected.name();
    assert_eq!(expected.name(), actual.name());
    assert_eq!(expected.field_type(), actual.field_type(), "{name}");
    assert_eq!(expected.title(), actual.title(), "{name}");
    assert_eq!(expected.description(), actual.description(), "{name}");
    assert_eq!(expected.required(), actual.required(), "{name}");
    assert_eq!(expected.readonly(), actual.readonly(), "{name}");
    assert_eq!(expected.default(), actual.default(), "{name}");
    assert_eq!(expected.missing_value(), actual.missing_value(), "{name}");
    assert_eq!(expected.min(), actual.min(), "{name}");
    assert_eq!(expected.max(), actual.max(), "{name}");
    assert_eq!(expected.min_length(), actual.min_length(), "{name}");
    assert_eq!(expected.max_length(), actual.max_length(), "{name}");
    assert_eq!(expected.choice(), actual.choice(), "{name}");
    match (expected.kind(), actual.kind()) {
        (
            FieldKind::Sequence { value_type: a, .. },
            FieldKind::Sequence { value_type: b, .. },
        ) => assert_same_embedded(a.as_deref(), b.as_deref()),
        (
            FieldKind::Dict {
                key_type: ka,
                value_type: va,
            },
            FieldKind::Dict {
                key_type: kb,
                value_type: vb,
            },
        ) => {
            assert_same_embedded(ka.as_deref(), kb.as_deref());
            assert_same_embedded(va.as_deref(), vb.as_deref());
        }
        (FieldKind::Object { schema: a }, FieldKind::Object { schema: b }) => assert_eq!(a, b),
        _ => {}
    }
}

fn assert_same_embedded(expected: Option<&Field>, actual: Option<&Field>) {
    match (expected, actual) {
        (Some(expected), Some(actual)) => assert_same_field(expected, actual),
        (None, None) => {}
        other => panic!("embedded descriptions differ: {other:?}"),
    }
}

fn assert_same_model(expected: &Model, actual: &Model) {
    assert_eq!(expected.len(), actual.len());
    for schema in expected.schemata() {
        let read = actual
            .get(schema.name())
            .unwrap_or_else(|| panic!("schema {:?} was not read", schema.name()));
        assert_eq!(schema.field_names(), read.field_names());
        assert_eq!(schema.field_names_in_order(), read.field_names_in_order());
        let bases = |s: &Schema| s.bases().iter().map(|b| b.name().to_owned()).collect::<Vec<_>>();
        assert_eq!(bases(schema), bases(read));
        assert_eq!(schema.fieldsets(), read.fieldsets());
        assert_eq!(schema.invariants(), read.invariants());
        for field in schema.fields() {
            assert_same_field(field, read.get(field.name()).unwrap());
        }
    }
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn markup_round_trip_keeps_every_field_type() {
    let model = sample_model();
    let text = to_markup(&model).unwrap();
    let read = from_markup(&text).unwrap();
    assert_same_model(&model, &read);
}

#[test]
fn document_round_trip_keeps_every_field_type() {
    let model = sample_model();
    let text = to_document(&model).unwrap();
    let read = from_document(&text).unwrap();
    assert_same_model(&model, &read);
}

#[test]
fn reading_is_stable() {
    let markup = to_markup(&sample_model()).unwrap();
    assert_eq!(to_markup(&from_markup(&markup).unwrap()).unwrap(), markup);
    let document = to_document(&sample_model()).unwrap();
    assert_eq!(to_document(&from_document(&document).unwrap()).unwrap(), document);
}

#[test]
fn markup_has_the_expected_shape() {
    let text = to_markup(&sample_model()).unwrap();
    assert!(text.contains("<model xmlns=\"urn:schema-interchange:model\""), "{text}");
    assert!(text.contains("<schema based-on=\"pkg.IBase\">"), "{text}");
    assert!(text.contains("<field name=\"count\" type=\"Int\">"), "{text}");
    assert!(text.contains("<min>1</min>"), "{text}");
    assert!(text.contains("<fieldset name=\"choices\" label=\"Choices\""), "{text}");
    assert!(text.contains("<invariant>pkg.invariants.consistent</invariant>"), "{text}");
    assert!(text.contains("<vocabulary>pkg.countries</vocabulary>"), "{text}");
    // Attributes at their default are not written.
    assert!(!text.contains("<readonly>False</readonly>"), "{text}");
}

#[test]
fn document_has_the_expected_scaffold() {
    let text = to_document(&sample_model()).unwrap();
    let document: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(document["$schema"], "http://json-schema.org/draft-04/schema#");
    let schemas = &document["properties"]["schemas"];
    assert_eq!(schemas["default"]["name"], "default");
    assert_eq!(schemas["default"]["based-on"], "pkg.IBase");
    assert_eq!(schemas["pkg.IBase"]["class"], "pkg.IBase");
    let count = schemas["default"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "count")
        .unwrap();
    assert_eq!(count["default"], serde_json::json!({"type": "int", "value": "5"}));
}

#[test]
fn empty_text_reads_as_empty_text() {
    let field = scalar(ScalarType::TextLine)
        .name("subtitle")
        .missing_value("")
        .build()
        .unwrap();
    let mut schema = Schema::new("");
    schema.add_field(field).unwrap();
    let mut model = Model::new();
    model.insert(schema);

    let read = from_markup(&to_markup(&model).unwrap()).unwrap();
    let subtitle = Arc::clone(read.schema().unwrap().get("subtitle").unwrap());
    assert_eq!(subtitle.missing_value(), &Value::from(""));
}

#[test]
fn unnamed_schema_and_one_named_default_are_not_merged_in_documents() {
    let mut unnamed = Schema::new("");
    unnamed.add_field(scalar(ScalarType::TextLine).name("x").build().unwrap()).unwrap();
    let mut named = Schema::new("default");
    named.add_field(scalar(ScalarType::TextLine).name("y").build().unwrap()).unwrap();
    let mut model = Model::new();
    model.insert(unnamed);
    model.insert(named);

    let read = from_markup(&to_markup(&model).unwrap()).unwrap();
    assert_eq!(read.schema().unwrap().field_names(), ["x"]);
    assert_eq!(read.get("default").unwrap().field_names(), ["y"]);

    let err = to_document(&model).unwrap_err();
    assert!(matches!(err, Error::Export(ref m) if m.contains("default")), "{err:?}");
}

/// Marks titles translatable in the `demo` domain and declares a prefix.
struct Translated;

impl FieldMetadataHandler for Translated {
    fn namespace(&self) -> Option<&str> {
        Some("urn:test:form")
    }

    fn prefix(&self) -> Option<&str> {
        Some("form")
    }

    fn write(&self, node: &mut Node, _: &Schema, _: &Field) -> schema_interchange::Result<()> {
        node.set_attribute("form:widget", "plain");
        if let Some(title) = node.children.iter_mut().find(|c| c.name == "title") {
            title.set_attribute("i18n:translate", "");
            title.set_attribute("i18n:domain", "demo");
        }
        Ok(())
    }

    fn read(&self, node: &Node, _: &mut Schema, _: &Field) -> schema_interchange::Result<()> {
        match node.attribute("form:widget") {
            Some("plain") => Ok(()),
            other => Err(Error::Import(format!("unexpected widget {other:?}"))),
        }
    }
}

#[test]
fn document_declares_namespaces_and_hoists_the_domain() {
    let mut schema = Schema::new("");
    for name in ["first", "second"] {
        schema
            .add_field(scalar(ScalarType::TextLine).name(name).title("Label").build().unwrap())
            .unwrap();
    }
    let mut model = Model::new();
    model.insert(schema);

    let serializer = Serializer::<Document>::new()
        .with_metadata(MetadataHandlers::new().with_field_handler(Arc::new(Translated)));
    let text = serializer.write_document(&model, DocumentOptions::default()).unwrap();
    let document: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(
        document["namespaces"],
        serde_json::json!({"i18n": I18N_NAMESPACE, "form": "urn:test:form"})
    );
    assert_eq!(document["i18n:domain"], "demo");
    for field in document["properties"]["schemas"]["default"]["fields"].as_array().unwrap() {
        assert_eq!(field["form:widget"], "plain");
        assert_eq!(field["title"]["i18n:translate"], "");
        assert!(field["title"].get("i18n:domain").is_none(), "{field}");
    }

    let read = serializer.read_document(&text).unwrap();
    assert_eq!(read.schema().unwrap().field_names(), ["first", "second"]);
    assert_eq!(read.schema().unwrap().get("first").unwrap().title(), "Label");
}

// =============================================================================
// Codec properties
// =============================================================================

proptest! {
    #[test]
    fn prop_text_values_round_trip(text in "[a-zA-Z0-9 &<>\"'.,;:!?-]{0,40}") {
        let field = scalar(ScalarType::Text).build().unwrap();
        let value = Value::Text(text);
        let node = encode::<Markup>(&field, &value, "default", true).unwrap();
        prop_assert_eq!(decode::<Markup>(&field, &node).unwrap(), value.clone());
        let node = encode::<Document>(&field, &value, "default", true).unwrap();
        prop_assert_eq!(decode::<Document>(&field, &node).unwrap(), value);
    }

    #[test]
    fn prop_int_lists_round_trip(items in proptest::collection::vec(any::<i64>(), 0..8)) {
        let field = FieldBuilder::new(FieldType::LIST).value_type(int()).build().unwrap();
        let value = Value::List(items.into_iter().map(Value::Int).collect());
        let node = encode::<Document>(&field, &value, "default", true).unwrap();
        prop_assert_eq!(decode::<Document>(&field, &node).unwrap(), value);
    }

    #[test]
    fn prop_none_reads_as_the_missing_value(missing in any::<i64>()) {
        let field = FieldBuilder::new(FieldType::INT).missing_value(missing).build().unwrap();
        for force in [false, true] {
            let node = encode::<Markup>(&field, &Value::None, "default", force).unwrap();
            prop_assert_eq!(decode::<Markup>(&field, &node).unwrap(), Value::Int(missing));
        }
    }
}
