//! rdf-xml: An in-memory RDF resource model with an RDF/XML processor and generator.
//!
//! This crate reads RDF/XML documents into a graph of resources and writes
//! graphs back out as RDF/XML.
//!
//! # Overview
//!
//! The model is resource-centric rather than triple-centric:
//! - **Resources own their properties**: each resource keeps an ordered list
//!   of (property, value) pairs, duplicates suppressed
//! - **Identity by IRI**: a [`Graph`] holds at most one resource per IRI;
//!   blank nodes have no IRI
//! - **Typed construction**: factories registered per type namespace decide
//!   which kind of resource (plain, list, bag, sequence) a typed node becomes
//!
//! # Quick Start
//!
//! ```rust
//! use rdf_xml::{parse, write, GeneratorOptions, Graph, Literal, Value, WriteOptions};
//!
//! let input = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
//!                          xmlns:ex="http://example.org/">
//!   <ex:Person rdf:about="http://x/1"><ex:name>Ann</ex:name></ex:Person>
//! </rdf:RDF>"#;
//!
//! let mut graph = Graph::new();
//! let roots = parse(&mut graph, input, None).unwrap();
//! let ann = roots[0];
//! assert!(graph.has_type(ann, "http://example.org/Person"));
//! assert_eq!(
//!     graph.first_value(ann, "http://example.org/name"),
//!     Some(&Value::Literal(Literal::plain("Ann")))
//! );
//!
//! let bytes = write(&graph, &GeneratorOptions::compact(), &WriteOptions::default()).unwrap();
//! assert!(String::from_utf8(bytes).unwrap().contains("ns1:Person"));
//! ```
//!
//! # Modules
//!
//! - [`model`]: Literals, resources, the graph, containers and lists
//! - [`xml`]: Namespace-aware XML tree with a reader and a writer
//! - [`codec`]: The RDF/XML processor and generator
//! - [`store`]: Loading and storing whole documents
//! - [`vocab`]: RDF and XML Schema vocabulary
//! - [`error`]: Error types
//!
//! # Threading
//!
//! A [`Graph`] is a plain value with no internal locking. Share it across
//! threads behind your own lock; [`store::RdfDocumentStore`] does this for
//! whole-document loads and stores.

pub mod codec;
pub mod error;
pub mod model;
pub mod store;
pub mod vocab;
pub mod xml;

// Re-export commonly used types at crate root
pub use codec::{GeneratorOptions, PrefixMap, RdfXmlGenerator, RdfXmlProcessor};
pub use error::{
    ErrorKind, FactoryError, GenerateError, ModelError, ProcessError, StoreError, XmlError,
};
pub use model::{
    BagResource, Graph, ListResource, Literal, PlainLiteral, PropertyValue, RdfContainer,
    RdfFactory, Resource, ResourceFactory, ResourceId, ResourceKind, SeqResource, TypedLiteral,
    Value, XmlLiteral,
};
pub use store::{ByteStore, FileStore, RdfDocumentStore};
pub use xml::{Document, WriteOptions};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reads an RDF/XML document into `graph` and returns its top-level
/// resources in document order.
///
/// Relative references resolve against `base`; without a base they must
/// be absolute.
pub fn parse(
    graph: &mut Graph,
    input: &[u8],
    base: Option<&str>,
) -> Result<Vec<ResourceId>, ProcessError> {
    let document = Document::parse(input)?;
    RdfXmlProcessor::new().process(graph, &document, base)
}

/// Writes every resource of `graph` that has properties as RDF/XML.
pub fn write(
    graph: &Graph,
    options: &GeneratorOptions,
    write_options: &WriteOptions,
) -> Result<Vec<u8>, GenerateError> {
    let document = RdfXmlGenerator::new(options.clone()).create_graph_document(graph)?;
    Ok(document.to_bytes(write_options)?)
}

/// Writes `roots` and the resources reachable from them as RDF/XML.
pub fn write_resources(
    graph: &Graph,
    roots: &[ResourceId],
    options: &GeneratorOptions,
    write_options: &WriteOptions,
) -> Result<Vec<u8>, GenerateError> {
    let document = RdfXmlGenerator::new(options.clone()).create_document(graph, roots)?;
    Ok(document.to_bytes(write_options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_parse() {
        let input = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://example.org/">
  <ex:Person rdf:about="http://x/1">
    <ex:name>Ann</ex:name>
    <ex:knows rdf:nodeID="b"/>
  </ex:Person>
  <rdf:Description rdf:nodeID="b" ex:name="Bob"/>
</rdf:RDF>"#;
        let mut graph = Graph::new();
        parse(&mut graph, input, None).unwrap();

        let bytes = write(&graph, &GeneratorOptions::new(), &WriteOptions::default()).unwrap();
        let mut reparsed = Graph::new();
        parse(&mut reparsed, &bytes, None).unwrap();

        let ann = reparsed.get("http://x/1").unwrap();
        let bob = reparsed
            .first_value(ann, "http://example.org/knows")
            .and_then(Value::as_resource)
            .unwrap();
        assert!(reparsed.is_blank(bob));
        assert_eq!(
            reparsed.first_value(bob, "http://example.org/name"),
            Some(&Value::Literal(Literal::plain("Bob")))
        );
    }

    #[test]
    fn test_write_resources_only_reachable() {
        let mut graph = Graph::new();
        let a = graph.locate_resource("http://x/a");
        let b = graph.locate_resource("http://x/b");
        graph
            .add_property_uri(a, "http://example.org/name", Literal::plain("A"))
            .unwrap();
        graph
            .add_property_uri(b, "http://example.org/name", Literal::plain("B"))
            .unwrap();

        let bytes =
            write_resources(&graph, &[a], &GeneratorOptions::new(), &WriteOptions::compact())
                .unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("http://x/a"));
        assert!(!xml.contains("http://x/b"));
    }
}
