//! Builds an [`Element`] tree from XML text with `quick-xml`.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, QName as RawName, ResolveResult};
use quick_xml::NsReader;

use crate::error::XmlError;
use crate::vocab::XML_NS;
use crate::xml::{Attribute, Document, Element, NamespaceDecl, QName, XmlNode};

fn utf8(bytes: &[u8]) -> Result<&str, XmlError> {
    std::str::from_utf8(bytes).map_err(|_| XmlError::InvalidUtf8)
}

/// Turns a quick-xml resolution into a namespace IRI. `xml:` is always bound.
fn namespace_of(resolved: ResolveResult<'_>) -> Result<Option<String>, XmlError> {
    match resolved {
        ResolveResult::Bound(namespace) => {
            let uri = utf8(namespace.as_ref())?;
            Ok((!uri.is_empty()).then(|| uri.to_string()))
        }
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) if prefix == b"xml" => Ok(Some(XML_NS.to_string())),
        ResolveResult::Unknown(prefix) => Err(XmlError::UnboundPrefix {
            prefix: utf8(&prefix)?.to_string(),
        }),
    }
}

fn resolve_name(
    raw: RawName<'_>,
    resolved: ResolveResult<'_>,
    local: &[u8],
) -> Result<QName, XmlError> {
    let prefix = raw
        .prefix()
        .map(|p| utf8(p.as_ref()).map(str::to_string))
        .transpose()?;
    Ok(QName {
        namespace: namespace_of(resolved)?,
        prefix,
        local: utf8(local)?.to_string(),
    })
}

fn malformed(position: u64, error: impl std::fmt::Display) -> XmlError {
    XmlError::Malformed {
        position,
        message: error.to_string(),
    }
}

/// Parses a complete document.
pub(crate) fn parse_document(input: &str) -> Result<Document, XmlError> {
    let mut reader = NsReader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| malformed(position, e))?;

        match event {
            Event::Start(start) => {
                let element = open_element(&reader, &start, position)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start, position)?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(position, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| malformed(position, e))?;
                    parent.push_text(&text);
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let bytes = data.into_inner();
                    let text = std::str::from_utf8(&bytes).map_err(|_| XmlError::InvalidUtf8)?;
                    parent.push_text(text);
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    let bytes = comment.into_inner();
                    let text = std::str::from_utf8(&bytes).map_err(|_| XmlError::InvalidUtf8)?;
                    parent.push(XmlNode::Comment(text.to_string()));
                }
            }
            Event::Eof => break,
            // Declarations, processing instructions and DOCTYPE carry nothing the tree keeps.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed(reader.buffer_position() as u64, "unclosed element"));
    }
    root.map(Document::new).ok_or(XmlError::NoRootElement)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    position: u64,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.push(XmlNode::Element(element));
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(malformed(position, "more than one root element"))
    }
}

/// Builds an element from a start tag. The reader has already pushed the
/// tag's own declarations, so names resolve in the element's scope.
fn open_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    position: u64,
) -> Result<Element, XmlError> {
    let (resolved, local) = reader.resolve_element(start.name());
    let mut element = Element::new(resolve_name(start.name(), resolved, local.as_ref())?);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| malformed(position, e))?;
        let value: Cow<'_, str> = attribute
            .unescape_value()
            .map_err(|e| malformed(position, e))?;

        match attribute.key.as_namespace_binding() {
            Some(PrefixDeclaration::Default) => element.namespaces.push(NamespaceDecl {
                prefix: None,
                uri: value.into_owned(),
            }),
            Some(PrefixDeclaration::Named(prefix)) => element.namespaces.push(NamespaceDecl {
                prefix: Some(utf8(prefix)?.to_string()),
                uri: value.into_owned(),
            }),
            None => {
                let (resolved, local) = reader.resolve_attribute(attribute.key);
                element.attributes.push(Attribute {
                    name: resolve_name(attribute.key, resolved, local.as_ref())?,
                    value: value.into_owned(),
                });
            }
        }
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = Document::parse_str(
            r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://example.org/">
  <Person rdf:about="http://x/1" lang="en"/>
</rdf:RDF>"#,
        )
        .unwrap();

        assert!(doc.root.name.is(RDF, "RDF"));
        let person = doc.root.child_elements().next().unwrap();
        assert!(person.name.is("http://example.org/", "Person"));
        assert_eq!(person.attribute(RDF, "about"), Some("http://x/1"));
        // Unprefixed attributes never take the default namespace.
        assert_eq!(person.attributes[1].name, QName::unqualified("lang"));
    }

    #[test]
    fn test_parse_keeps_text_verbatim() {
        let doc = Document::parse_str("<a>  x &amp; <![CDATA[<y>]]> </a>").unwrap();
        assert_eq!(doc.root.text(), "  x & <y> ");
        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn test_parse_xml_prefix_is_predeclared() {
        let doc = Document::parse_str(r#"<a xml:lang="de"/>"#).unwrap();
        assert_eq!(doc.root.attribute(XML_NS, "lang"), Some("de"));
    }

    #[test]
    fn test_parse_unbound_prefix_fails() {
        let err = Document::parse_str("<ex:a/>").unwrap_err();
        assert_eq!(
            err,
            XmlError::UnboundPrefix {
                prefix: "ex".to_string()
            }
        );
    }

    #[test]
    fn test_parse_malformed_fails() {
        assert!(matches!(
            Document::parse_str("<a><b></a>"),
            Err(XmlError::Malformed { .. })
        ));
        assert_eq!(Document::parse_str("   "), Err(XmlError::NoRootElement));
    }

    #[test]
    fn test_parse_redeclared_prefix_is_scoped() {
        let doc = Document::parse_str(
            r#"<a:x xmlns:a="urn:1#"><a:y xmlns:a="urn:2#" a:k="v"/><a:z a:k="w"/></a:x>"#,
        )
        .unwrap();
        let children: Vec<&Element> = doc.root.child_elements().collect();
        assert!(children[0].name.is("urn:2#", "y"));
        assert_eq!(children[0].attribute("urn:2#", "k"), Some("v"));
        assert_eq!(
            children[0].namespaces,
            vec![NamespaceDecl {
                prefix: Some("a".to_string()),
                uri: "urn:2#".to_string()
            }]
        );
        assert!(children[1].name.is("urn:1#", "z"));
        assert_eq!(children[1].attribute("urn:1#", "k"), Some("w"));
    }

    #[test]
    fn test_parse_inner_default_namespace_undeclared() {
        let doc = Document::parse_str(r#"<a xmlns="urn:x#"><b xmlns=""/></a>"#).unwrap();
        assert!(doc.root.name.is("urn:x#", "a"));
        let b = doc.root.child_elements().next().unwrap();
        assert_eq!(b.name.namespace, None);
    }
}
