//! RDF/XML reading and writing.
//!
//! [`RdfXmlProcessor`] turns an XML tree into resources of a [`Graph`](crate::model::Graph);
//! [`RdfXmlGenerator`] does the reverse. Both work on the tree types of
//! [`crate::xml`], so byte-level parsing and writing stay in one place.

pub mod generator;
pub mod iri;
pub mod namespaces;
pub mod processor;

pub use generator::{GeneratorOptions, RdfXmlGenerator};
pub use iri::{anchor, is_ncname, relativize, resolve, split_iri};
pub use namespaces::PrefixMap;
pub use processor::RdfXmlProcessor;
