//! Namespace-aware XML tree used on both sides of the RDF/XML codec.
//!
//! The tree is deliberately small: elements, text and comments. Names are
//! stored fully resolved ([`QName`] carries both the prefix it was written
//! with and the namespace IRI it is bound to), so the processor never has to
//! look at prefixes and the generator never has to track scopes.
//!
//! Reading is done by [`Document::parse`] and writing by
//! [`Document::to_bytes`], both on top of `quick-xml`.

pub mod reader;
pub mod writer;

use std::fmt;

use rustc_hash::FxHashSet;

use crate::error::XmlError;
use crate::vocab::XML_NS;

pub use writer::{write_fragment, WriteOptions};

/// A namespace-qualified XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Prefix used when writing the name (`None` for the default namespace or no namespace).
    pub prefix: Option<String>,
    /// Namespace IRI the name belongs to.
    pub namespace: Option<String>,
    /// Local part of the name.
    pub local: String,
}

impl QName {
    /// Creates a name in a namespace, written with the given prefix.
    pub fn qualified(prefix: &str, namespace: &str, local: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            namespace: Some(namespace.to_string()),
            local: local.to_string(),
        }
    }

    /// Creates a name without a namespace.
    pub fn unqualified(local: &str) -> Self {
        Self {
            prefix: None,
            namespace: None,
            local: local.to_string(),
        }
    }

    /// Returns true if this name is `local` in `namespace`.
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }

    /// Returns true if this name belongs to `namespace`.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// Concatenates namespace and local name, the RDF/XML way of turning a name into an IRI.
    pub fn to_iri(&self) -> Option<String> {
        self.namespace
            .as_ref()
            .map(|ns| format!("{}{}", ns, self.local))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceDecl {
    /// Declared prefix, `None` for the default namespace.
    pub prefix: Option<String>,
    /// Namespace IRI; empty undeclares the default namespace.
    pub uri: String,
}

/// An attribute of an element. Namespace declarations are not attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

impl XmlNode {
    /// Returns the element if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// An XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Namespace declarations written on this element.
    pub namespaces: Vec<NamespaceDecl>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
    /// When set, the writer never indents inside this element.
    pub preserve_whitespace: bool,
}

impl Element {
    /// Creates an empty element.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            preserve_whitespace: false,
        }
    }

    /// Returns the value of the attribute `local` in `namespace`.
    pub fn attribute(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(namespace, local))
            .map(|a| a.value.as_str())
    }

    /// Returns true if an attribute with the same namespace and local name exists.
    pub fn has_attribute_named(&self, name: &QName) -> bool {
        self.attributes
            .iter()
            .any(|a| a.name.namespace == name.namespace && a.name.local == name.local)
    }

    /// Sets an attribute, replacing any attribute with the same namespace and local name.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name.namespace == name.namespace && a.name.local == name.local)
        {
            existing.value = value;
        } else {
            self.attributes.push(Attribute { name, value });
        }
    }

    /// Appends a child node.
    pub fn push(&mut self, node: XmlNode) {
        self.children.push(node);
    }

    /// Appends a text child, merging with a preceding text node.
    pub fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Iterates over child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                text.push_str(t);
            }
        }
        text
    }

    /// Declares on this element every namespace its subtree uses but does
    /// not declare itself, so the element can be moved into any document.
    pub fn declare_used_namespaces(&mut self) {
        let mut scope: Vec<NamespaceDecl> = self.namespaces.clone();
        let mut missing: Vec<NamespaceDecl> = Vec::new();
        collect_missing(self, &mut scope, &mut missing, true);

        let mut seen: FxHashSet<Option<String>> =
            self.namespaces.iter().map(|d| d.prefix.clone()).collect();
        for decl in missing {
            if seen.insert(decl.prefix.clone()) {
                self.namespaces.push(decl);
            }
        }
    }
}

fn collect_missing(
    element: &Element,
    scope: &mut Vec<NamespaceDecl>,
    missing: &mut Vec<NamespaceDecl>,
    is_root: bool,
) {
    let depth = scope.len();
    if !is_root {
        scope.extend(element.namespaces.iter().cloned());
    }

    let mut check = |name: &QName, scope: &Vec<NamespaceDecl>| {
        let Some(namespace) = &name.namespace else {
            return;
        };
        if namespace == XML_NS {
            return;
        }
        let bound = scope
            .iter()
            .rev()
            .find(|d| d.prefix == name.prefix)
            .map(|d| d.uri.as_str());
        if bound != Some(namespace.as_str()) {
            missing.push(NamespaceDecl {
                prefix: name.prefix.clone(),
                uri: namespace.clone(),
            });
        }
    };

    check(&element.name, scope);
    for attribute in &element.attributes {
        check(&attribute.name, scope);
    }
    for child in element.child_elements() {
        collect_missing(child, scope, missing, false);
    }
    scope.truncate(depth);
}

/// A parsed or generated XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Wraps a root element.
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parses a UTF-8 encoded XML document.
    pub fn parse(input: &[u8]) -> Result<Self, XmlError> {
        let text = std::str::from_utf8(input).map_err(|_| XmlError::InvalidUtf8)?;
        Self::parse_str(text)
    }

    /// Parses an XML document from a string.
    pub fn parse_str(input: &str) -> Result<Self, XmlError> {
        reader::parse_document(input)
    }

    /// Serializes the document.
    pub fn to_bytes(&self, options: &WriteOptions) -> Result<Vec<u8>, XmlError> {
        let mut out = Vec::new();
        writer::write_document(self, &mut out, options)?;
        Ok(out)
    }

    /// Serializes the document into a writer.
    pub fn write_to<W: std::io::Write>(
        &self,
        out: W,
        options: &WriteOptions,
    ) -> Result<(), XmlError> {
        writer::write_document(self, out, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_iri_and_display() {
        let name = QName::qualified("ex", "http://example.org/", "name");
        assert_eq!(name.to_iri().as_deref(), Some("http://example.org/name"));
        assert_eq!(name.to_string(), "ex:name");
        assert!(name.is("http://example.org/", "name"));
        assert_eq!(QName::unqualified("x").to_iri(), None);
    }

    #[test]
    fn test_set_attribute_replaces_same_name() {
        let mut element = Element::new(QName::unqualified("e"));
        element.set_attribute(QName::qualified("a", "urn:a#", "x"), "1");
        element.set_attribute(QName::qualified("b", "urn:a#", "x"), "2");
        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.attribute("urn:a#", "x"), Some("2"));
    }

    #[test]
    fn test_declare_used_namespaces_pushes_down_bindings() {
        let mut inner = Element::new(QName::qualified("h", "http://www.w3.org/1999/xhtml", "b"));
        inner.set_attribute(QName::qualified("ex", "http://example.org/", "flag"), "y");
        let mut outer = Element::new(QName::qualified("h", "http://www.w3.org/1999/xhtml", "p"));
        outer.push(XmlNode::Element(inner));

        outer.declare_used_namespaces();

        let mut prefixes: Vec<_> = outer
            .namespaces
            .iter()
            .map(|d| (d.prefix.clone().unwrap_or_default(), d.uri.clone()))
            .collect();
        prefixes.sort();
        assert_eq!(
            prefixes,
            vec![
                ("ex".to_string(), "http://example.org/".to_string()),
                ("h".to_string(), "http://www.w3.org/1999/xhtml".to_string()),
            ]
        );
    }

    #[test]
    fn test_declare_used_namespaces_respects_inner_declarations() {
        let mut inner = Element::new(QName::qualified("q", "urn:q#", "leaf"));
        inner.namespaces.push(NamespaceDecl {
            prefix: Some("q".to_string()),
            uri: "urn:q#".to_string(),
        });
        let mut outer = Element::new(QName::unqualified("plain"));
        outer.push(XmlNode::Element(inner));

        outer.declare_used_namespaces();
        assert!(outer.namespaces.is_empty());
    }
}
