//! The markup-tree (XML) rendering.

use std::borrow::Cow;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::format::Markup;
use crate::model::Model;
use crate::node::Node;
use crate::serializer::Serializer;

/// Layout of rendered markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupOptions {
    /// Spaces per nesting level; `None` renders on one line.
    pub indent: Option<usize>,
    /// Whether to start with an XML declaration.
    pub declaration: bool,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            declaration: true,
        }
    }
}

/// Serializes `model` to markup with the standard handlers.
///
/// # Errors
///
/// See [`Serializer::write_tree`].
pub fn to_markup(model: &Model) -> Result<String> {
    Serializer::<Markup>::new().write_markup(model, MarkupOptions::default())
}

/// Parses a model from markup with the standard handlers.
///
/// # Errors
///
/// See [`Serializer::read_tree`]; malformed markup is an
/// [`Error::Markup`].
pub fn from_markup(text: &str) -> Result<Model> {
    Serializer::<Markup>::new().read_markup(text)
}

impl<'r> Serializer<'r, Markup> {
    /// Serializes `model` to markup.
    ///
    /// # Errors
    ///
    /// See [`Serializer::write_tree`].
    pub fn write_markup(&self, model: &Model, options: MarkupOptions) -> Result<String> {
        render(&self.write_tree(model)?, options)
    }

    /// Parses a model from markup.
    ///
    /// # Errors
    ///
    /// See [`Serializer::read_tree`]; malformed markup is an
    /// [`Error::Markup`].
    pub fn read_markup(&self, text: &str) -> Result<Model> {
        self.read_tree(&parse(text)?)
    }
}

/// Renders a node tree as markup.
///
/// # Errors
///
/// Returns [`Error::Io`] if writing fails.
pub fn render(root: &Node, options: MarkupOptions) -> Result<String> {
    let mut writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    if options.declaration {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }
    write_node(&mut writer, root)?;
    String::from_utf8(writer.into_inner())
        .map_err(|err| Error::Export(format!("rendered markup is not UTF-8: {err}")))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (name, value) in &node.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }
    if node.children.is_empty() && node.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
    Ok(())
}

/// Parses markup into a node tree.
///
/// Text is kept verbatim on leaf nodes. Text between child elements is
/// layout and is dropped.
///
/// # Errors
///
/// Returns [`Error::Markup`] for malformed markup and [`Error::Import`] if
/// there is not exactly one root element.
pub fn parse(text: &str) -> Result<Node> {
    let mut reader = Reader::from_str(text);
    let mut open: Vec<Node> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => open.push(start_node(&start)?),
            Event::Empty(start) => attach(&mut open, &mut root, start_node(&start)?)?,
            Event::End(_) => {
                let mut node = open
                    .pop()
                    .ok_or_else(|| Error::Import("unbalanced end tag".to_owned()))?;
                if !node.children.is_empty() {
                    node.text = None;
                }
                attach(&mut open, &mut root, node)?;
            }
            Event::Text(text) => append_text(&mut open, &text.unescape()?),
            Event::CData(data) => {
                let data = std::str::from_utf8(&data)
                    .map_err(|err| Error::Import(format!("CDATA is not UTF-8: {err}")))?;
                append_text(&mut open, data);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if let Some(node) = open.last() {
        return Err(Error::Import(format!("unclosed element `{}`", node.name)));
    }
    root.ok_or_else(|| Error::Import("markup has no root element".to_owned()))
}

fn start_node(start: &BytesStart<'_>) -> Result<Node> {
    let mut node = Node::new(utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let value = attribute.unescape_value()?;
        node.attributes
            .push((utf8(attribute.key.as_ref())?.into_owned(), value.into_owned()));
    }
    Ok(node)
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|err| Error::Import(format!("name is not UTF-8: {err}")))
}

fn append_text(open: &mut [Node], text: &str) {
    if let Some(node) = open.last_mut() {
        node.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn attach(open: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    if let Some(parent) = open.last_mut() {
        parent.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::Import(format!(
            "second root element `{}`",
            node.name
        )));
    }
    *root = Some(node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut root = Node::new("model").with_attribute("xmlns", "urn:test");
        let mut field = Node::new("field")
            .with_attribute("name", "title")
            .with_attribute("type", "TextLine");
        field.push(Node::new("title").with_text("Fish & <chips>"));
        field.push(Node::new("default").with_text("  padded  "));
        field.push(Node::new("missing_value").with_attribute("type", "missing"));
        root.push(field);
        root
    }

    #[test]
    fn render_then_parse_keeps_the_tree() {
        for options in [
            MarkupOptions::default(),
            MarkupOptions {
                indent: None,
                declaration: false,
            },
        ] {
            let text = render(&sample(), options).unwrap();
            assert_eq!(parse(&text).unwrap(), sample(), "{text}");
        }
    }

    #[test]
    fn rendering_is_indented() {
        let text = render(&sample(), MarkupOptions::default()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("\n  <field name=\"title\" type=\"TextLine\">"), "{text}");
        assert!(text.contains("<title>Fish &amp; &lt;chips&gt;</title>"), "{text}");
        assert!(text.contains("<missing_value type=\"missing\"/>"), "{text}");
    }

    #[test]
    fn cdata_and_comments() {
        let node = parse("<model><!-- note --><title><![CDATA[a<b]]></title></model>").unwrap();
        assert_eq!(node.children[0].text.as_deref(), Some("a<b"));
    }

    #[test]
    fn malformed_markup_is_rejected() {
        assert!(matches!(parse("<model><field></model>"), Err(Error::Markup(_))));
        assert!(matches!(parse("<a/><b/>"), Err(Error::Import(_))));
        assert!(matches!(parse(""), Err(Error::Import(_))));
    }
}
