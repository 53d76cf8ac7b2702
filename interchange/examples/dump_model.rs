//! Builds a small model, writes it in both encodings and reads it back.
//!
//! Run with: `cargo run --example dump_model -p schema-interchange`

use std::sync::Arc;

use anyhow::{ensure, Context};
use schema_interchange::{
    merge, Field, FieldBuilder, FieldMetadataHandler, FieldType, Markup, MarkupOptions,
    MetadataHandlers, Model, Node, Schema, Serializer, SimpleVocabulary, Term, Value, Vocabulary,
};

/// Marks every field as translatable in the `demo` domain.
struct Translated;

impl FieldMetadataHandler for Translated {
    fn write(
        &self,
        node: &mut Node,
        _: &Schema,
        _: &Field,
    ) -> schema_interchange::Result<()> {
        if let Some(title) = node.children.iter_mut().find(|c| c.name == "title") {
            title.set_attribute("i18n:translate", "");
            title.set_attribute("i18n:domain", "demo");
        }
        Ok(())
    }

    fn read(&self, _: &Node, _: &mut Schema, _: &Field) -> schema_interchange::Result<()> {
        Ok(())
    }
}

fn build_model() -> anyhow::Result<Model> {
    let mut base = Schema::new("demo.IBase");
    base.add_field(
        FieldBuilder::new(FieldType::TEXT_LINE)
            .name("title")
            .title("Title")
            .build()?,
    )?;

    let mut schema = Schema::new("");
    let mut model = Model::new();
    schema.add_base(model.insert(base));
    schema.add_field(
        FieldBuilder::new(FieldType::Choice)
            .name("color")
            .title("Color")
            .vocabulary(Vocabulary::Simple(SimpleVocabulary::new(vec![
                Term::new("red"),
                Term::new("green").with_title("Green"),
            ])?))
            .default("red")
            .build()?,
    )?;
    schema.add_field(
        FieldBuilder::new(FieldType::Dict)
            .name("limits")
            .key_type(FieldBuilder::new(FieldType::TEXT_LINE).build()?)
            .value_type(FieldBuilder::new(FieldType::INT).min(0).build()?)
            .default(Value::Dict(vec![("items".into(), 10.into())]))
            .required(false)
            .build()?,
    )?;
    model.insert(schema);
    Ok(model)
}

fn main() -> anyhow::Result<()> {
    let model = build_model()?;
    let metadata = MetadataHandlers::new().with_field_handler(Arc::new(Translated));

    let markup = Serializer::<Markup>::new()
        .with_metadata(metadata)
        .write_markup(&model, MarkupOptions::default())
        .context("writing markup")?;
    println!("Markup ({} bytes):\n{markup}\n", markup.len());

    let document = schema_interchange::to_document(&model).context("writing document")?;
    println!("Document ({} bytes):\n{document}\n", document.len());

    let from_markup = schema_interchange::from_markup(&markup).context("reading markup")?;
    let from_document =
        schema_interchange::from_document(&document).context("reading document")?;
    for read in [&from_markup, &from_document] {
        let schema = read.schema().context("default schema")?;
        ensure!(schema.field_names() == ["color", "limits"], "fields were lost");
    }

    let mut merged = Schema::new("demo.IMerged");
    let source = from_document.schema().context("default schema")?;
    merge(source, &mut merged, false, true);
    println!("Merged fields: {:?}", merged.field_names_in_order());
    Ok(())
}
