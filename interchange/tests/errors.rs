//! Failures surface as typed errors; nothing is dropped silently.

use schema_interchange::{
    from_document, from_markup, to_document, to_markup, Error, FieldBuilder, FieldHandler,
    FieldType, HandlerRegistry, Markup, MarkupOptions, Model, Schema, Serializer,
    SimpleVocabulary, Term, Vocabulary,
};

fn model_with(field: schema_interchange::Field) -> Model {
    let mut schema = Schema::new("");
    schema.add_field(field).unwrap();
    let mut model = Model::new();
    model.insert(schema);
    model
}

#[test]
fn unregistered_type_names_field_and_type() {
    let model = model_with(
        FieldBuilder::new(FieldType::INT)
            .name("count")
            .build()
            .unwrap(),
    );
    let mut registry = HandlerRegistry::<Markup>::empty();
    registry.register(FieldHandler::new(FieldType::TEXT));

    let err = Serializer::<Markup>::new()
        .with_registry(&registry)
        .write_markup(&model, MarkupOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Value(_)), "{err:?}");
    assert_eq!(
        err.to_string(),
        "field type Int specified for field \"count\" is not supported"
    );
}

#[test]
fn unregistered_type_on_read() {
    let markup = r#"<model><schema><field name="x" type="Unheard"/></schema></model>"#;
    let err = from_markup(markup).unwrap_err();
    assert!(matches!(err, Error::Value(ref m) if m.contains("Unheard")), "{err:?}");
}

#[test]
fn unrepresentable_vocabularies_are_rejected() {
    let dynamic = model_with(
        FieldBuilder::new(FieldType::Choice)
            .name("catalog")
            .vocabulary(Vocabulary::Dynamic("pkg.catalog_factory".into()))
            .build()
            .unwrap(),
    );
    assert!(matches!(to_markup(&dynamic), Err(Error::Export(_))));
    assert!(matches!(to_document(&dynamic), Err(Error::Export(_))));

    let custom_tokens = model_with(
        FieldBuilder::new(FieldType::Choice)
            .name("size")
            .vocabulary(Vocabulary::Simple(
                SimpleVocabulary::new(vec![Term::tokenized("small", "s")]).unwrap(),
            ))
            .build()
            .unwrap(),
    );
    assert!(matches!(to_markup(&custom_tokens), Err(Error::Export(_))));
}

#[test]
fn object_defaults_are_not_written() {
    let registry = HandlerRegistry::<Markup>::standard();
    let handler = registry.lookup(FieldType::Object).unwrap();
    let field = FieldBuilder::new(FieldType::Object)
        .name("address")
        .schema("pkg.IAddress")
        .build()
        .unwrap();
    let node = handler.write(&field, "address", "field", &registry).unwrap();
    assert!(node.child("default").is_none());
}

#[test]
fn structural_errors_on_read() {
    let wrong_root = "<schemas/>";
    assert!(matches!(from_markup(wrong_root), Err(Error::Import(_))));

    let unknown_base = r#"<model><schema based-on="pkg.Nowhere"/></model>"#;
    let err = from_markup(unknown_base).unwrap_err();
    assert!(matches!(err, Error::Import(ref m) if m.contains("pkg.Nowhere")), "{err:?}");

    let cyclic = r#"<model>
        <schema name="pkg.A" based-on="pkg.B"/>
        <schema name="pkg.B" based-on="pkg.A"/>
    </model>"#;
    assert!(matches!(from_markup(cyclic), Err(Error::Import(_))));

    assert!(matches!(
        from_markup("<model><schema>"),
        Err(Error::Import(_) | Error::Markup(_))
    ));
    assert!(matches!(from_document("[]"), Err(Error::Document(_))));
}

#[test]
fn incompatible_value_types_on_read() {
    let document = r#"{
        "properties": {"schemas": {"default": {"fields": [
            {"name": "count", "type": "Int", "default": {"type": "text", "value": "many"}}
        ]}}}
    }"#;
    let err = from_document(document).unwrap_err();
    assert!(matches!(err, Error::Decode { ref node, .. } if node == "default"), "{err:?}");
}

#[test]
fn invalid_values_on_read() {
    let markup = r#"<model><schema>
        <field name="count" type="Int"><min>5</min><default>1</default></field>
    </schema></model>"#;
    assert!(matches!(from_markup(markup), Err(Error::Value(_))));
}

#[test]
fn text_its_reader_would_reject_is_not_exported() {
    let object = model_with(
        FieldBuilder::new(FieldType::Object)
            .name("address")
            .schema("not a dotted\nname")
            .build()
            .unwrap(),
    );
    assert!(matches!(to_markup(&object), Err(Error::Export(_))));
    assert!(matches!(to_document(&object), Err(Error::Export(_))));

    let title = model_with(
        FieldBuilder::new(FieldType::TEXT_LINE)
            .name("headline")
            .title("two\nlines")
            .build()
            .unwrap(),
    );
    let err = to_markup(&title).unwrap_err();
    assert!(matches!(err, Error::Export(ref m) if m.contains("line break")), "{err:?}");
}
