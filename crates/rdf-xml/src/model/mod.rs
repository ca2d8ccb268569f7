//! In-memory RDF model.
//!
//! This module contains the types the codec reads into and writes from:
//! - Literals (plain, typed, XML) and their ordering
//! - Resources, owned by a [`Graph`] and addressed by [`ResourceId`]
//! - Containers (`rdf:Seq`, `rdf:Bag`) and lists (`rdf:first`/`rdf:rest`)
//! - Statements, the intermediate form produced while parsing

pub mod container;
pub mod graph;
pub mod list;
pub mod literal;
pub mod resource;
pub mod statement;

pub use container::{member_index, member_property_uri, BagResource, RdfContainer, SeqResource};
pub use graph::{Graph, RdfFactory, ResourceFactory};
pub use list::{ListIter, ListResource};
pub use literal::{Collator, Literal, PlainLiteral, TypedLiteral, XmlLiteral};
pub use resource::{PropertyValue, Resource, ResourceId, ResourceKind, Value};
pub use statement::{Object, ProxyId, ProxyKey, Statement, Term};
