//! Intermediate statements collected while reading RDF/XML.
//!
//! A statement's terms may still be proxies: placeholders for resources
//! whose concrete kind is only known once the whole document has been read.

use std::fmt;

use crate::model::{Literal, ResourceId};

/// Identity of a proxy: an IRI or a node identifier.
///
/// Anonymous blank nodes get generated identifiers with a `genid:` prefix,
/// which can never collide with an `rdf:nodeID` (those are NCNames).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProxyKey {
    Uri(String),
    NodeId(String),
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKey::Uri(uri) => write!(f, "<{uri}>"),
            ProxyKey::NodeId(id) => write!(f, "_:{id}"),
        }
    }
}

/// Handle to a proxy interned by a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(pub(crate) u32);

/// Subject, predicate or resource object of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    Resource(ResourceId),
    Proxy(ProxyId),
}

impl Term {
    pub fn as_resource(&self) -> Option<ResourceId> {
        match self {
            Term::Resource(id) => Some(*id),
            Term::Proxy(_) => None,
        }
    }

    pub fn as_proxy(&self) -> Option<ProxyId> {
        match self {
            Term::Proxy(id) => Some(*id),
            Term::Resource(_) => None,
        }
    }
}

/// Object of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Object {
    Term(Term),
    Literal(Literal),
}

impl Object {
    pub fn as_term(&self) -> Option<Term> {
        match self {
            Object::Term(term) => Some(*term),
            Object::Literal(_) => None,
        }
    }
}

/// A subject-predicate-object triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Object,
}

impl Statement {
    pub fn new(subject: Term, predicate: Term, object: Object) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Returns true once no term is a proxy.
    pub fn is_resolved(&self) -> bool {
        matches!(self.subject, Term::Resource(_))
            && matches!(self.predicate, Term::Resource(_))
            && !matches!(self.object, Object::Term(Term::Proxy(_)))
    }
}
