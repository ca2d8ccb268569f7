//! Serializes an [`Element`] tree with `quick-xml`.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::XmlError;
use crate::vocab::XML_NS;
use crate::xml::{Document, Element, QName, XmlNode};

/// Options for writing XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indentation width for element-only content; `None` writes everything on one line.
    pub indent: Option<usize>,
    /// Emit the `<?xml ...?>` declaration.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            declaration: true,
        }
    }
}

impl WriteOptions {
    /// Creates default options (two-space indentation, with declaration).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options that write the whole document on one line.
    pub fn compact() -> Self {
        Self {
            indent: None,
            declaration: true,
        }
    }
}

/// Escapes an attribute value. Line breaks and tabs become character
/// references so attribute-value normalization keeps them.
fn escape_attribute(value: &str) -> String {
    let escaped = quick_xml::escape::escape(value);
    if !escaped.contains(['\n', '\t', '\r']) {
        return escaped.into_owned();
    }
    escaped
        .replace('\n', "&#10;")
        .replace('\t', "&#9;")
        .replace('\r', "&#13;")
}

pub(crate) fn write_document<W: Write>(
    document: &Document,
    out: W,
    options: &WriteOptions,
) -> Result<(), XmlError> {
    let mut writer = TreeWriter::new(out, options.indent);
    if options.declaration {
        writer.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.event(Event::Text(BytesText::new("\n")))?;
    }
    writer.element(&document.root, 0, true)?;
    if options.indent.is_some() {
        writer.event(Event::Text(BytesText::new("\n")))?;
    }
    Ok(())
}

/// Serializes a node list without declaration or indentation.
///
/// Every top-level element declares the namespaces it uses, so the result is
/// the self-contained lexical form of an XML literal.
pub fn write_fragment(nodes: &[XmlNode]) -> Result<String, XmlError> {
    let mut out = Vec::new();
    let mut writer = TreeWriter::new(&mut out, None);
    for node in nodes {
        writer.node(node, 0, false)?;
    }
    String::from_utf8(out).map_err(|_| XmlError::InvalidUtf8)
}

struct TreeWriter<W: Write> {
    writer: Writer<W>,
    indent: Option<usize>,
    /// In-scope bindings: prefix -> namespace ("" means undeclared).
    scopes: Vec<(Option<String>, String)>,
}

impl<W: Write> TreeWriter<W> {
    fn new(out: W, indent: Option<usize>) -> Self {
        Self {
            writer: Writer::new(out),
            indent,
            scopes: Vec::new(),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), XmlError> {
        self.writer
            .write_event(event)
            .map_err(|e| XmlError::Write(e.to_string()))
    }

    fn bound(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        self.scopes
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, ns)| ns.as_str())
            .filter(|ns| !ns.is_empty())
    }

    fn node(&mut self, node: &XmlNode, depth: usize, indent: bool) -> Result<(), XmlError> {
        match node {
            XmlNode::Element(element) => self.element(element, depth, indent),
            XmlNode::Text(text) => self.event(Event::Text(BytesText::new(text))),
            XmlNode::Comment(text) => self.event(Event::Comment(BytesText::from_escaped(text.as_str()))),
        }
    }

    fn element(&mut self, element: &Element, depth: usize, indent: bool) -> Result<(), XmlError> {
        let scope_depth = self.scopes.len();
        let tag = element.name.to_string();
        let mut start = BytesStart::new(tag.clone());

        for decl in &element.namespaces {
            declare(&mut start, decl.prefix.as_deref(), &decl.uri);
            self.scopes.push((decl.prefix.clone(), decl.uri.clone()));
        }

        self.ensure_bound(&mut start, &element.name, true)?;
        for attribute in &element.attributes {
            self.ensure_bound(&mut start, &attribute.name, false)?;
            let key = attribute.name.to_string();
            let value = escape_attribute(&attribute.value);
            start.push_attribute((key.as_bytes(), value.as_bytes()));
        }

        if element.children.is_empty() {
            self.event(Event::Empty(start))?;
        } else {
            self.event(Event::Start(start))?;

            let pretty = indent
                && !element.preserve_whitespace
                && element
                    .children
                    .iter()
                    .all(|c| !matches!(c, XmlNode::Text(_)));
            match self.indent.filter(|_| pretty) {
                Some(width) => {
                    for child in &element.children {
                        self.newline(width * (depth + 1))?;
                        self.node(child, depth + 1, true)?;
                    }
                    self.newline(width * depth)?;
                }
                None => {
                    for child in &element.children {
                        self.node(child, depth + 1, false)?;
                    }
                }
            }

            self.event(Event::End(BytesEnd::new(tag)))?;
        }

        self.scopes.truncate(scope_depth);
        Ok(())
    }

    /// Adds a namespace declaration when `name`'s prefix is not bound to its namespace.
    fn ensure_bound(
        &mut self,
        start: &mut BytesStart<'_>,
        name: &QName,
        is_element: bool,
    ) -> Result<(), XmlError> {
        match &name.namespace {
            Some(namespace) => {
                if namespace == XML_NS {
                    return Ok(());
                }
                if !is_element && name.prefix.is_none() {
                    return Err(XmlError::MissingPrefix {
                        namespace: namespace.clone(),
                        local: name.local.clone(),
                    });
                }
                if self.bound(name.prefix.as_deref()) != Some(namespace.as_str()) {
                    declare(start, name.prefix.as_deref(), namespace);
                    self.scopes.push((name.prefix.clone(), namespace.clone()));
                }
            }
            None => {
                if is_element && self.bound(None).is_some() {
                    declare(start, None, "");
                    self.scopes.push((None, String::new()));
                }
            }
        }
        Ok(())
    }

    fn newline(&mut self, width: usize) -> Result<(), XmlError> {
        let text = format!("\n{}", " ".repeat(width));
        self.event(Event::Text(BytesText::new(&text)))
    }
}

fn declare(start: &mut BytesStart<'_>, prefix: Option<&str>, uri: &str) {
    match prefix {
        Some(prefix) => {
            let key = format!("xmlns:{prefix}");
            start.push_attribute((key.as_str(), uri));
        }
        None => start.push_attribute(("xmlns", uri)),
    }
}
