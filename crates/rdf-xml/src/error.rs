//! Error types for the resource model, the XML layer and the RDF/XML codec.

use thiserror::Error;

/// Classification of processing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed XML or a malformed IRI.
    Syntax,
    /// Well-formed XML that violates the RDF/XML grammar.
    Structure,
    /// A lookup of something that was never seen.
    Lookup,
}

impl ErrorKind {
    /// Returns a short name for this kind (e.g., "syntax").
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Structure => "structure",
            ErrorKind::Lookup => "lookup",
        }
    }
}

/// Error while reading or writing XML.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("invalid UTF-8 in XML input")]
    InvalidUtf8,

    #[error("namespace prefix {prefix:?} is not bound")]
    UnboundPrefix { prefix: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("attribute {local:?} in namespace {namespace:?} has no prefix")]
    MissingPrefix { namespace: String, local: String },

    #[error("failed to write XML: {0}")]
    Write(String),
}

/// Error raised by resource model operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("malformed container member property {uri:?}")]
    MalformedMemberProperty { uri: String },

    #[error("list index {index} out of bounds (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("the nil list cannot be modified in place")]
    NilList,

    #[error("resource {resource} is not a {expected}")]
    WrongKind {
        resource: String,
        expected: &'static str,
    },

    #[error("list is not terminated by rdf:nil (broken at {resource})")]
    BrokenList { resource: String },
}

/// Error raised by a resource factory. Never surfaces past the graph.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("resource factory failed: {0}")]
pub struct FactoryError(pub String);

/// Error while turning an RDF/XML tree into resources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    // === Syntax ===
    #[error("invalid IRI {iri:?}: {message}")]
    InvalidIri { iri: String, message: String },

    #[error(transparent)]
    Xml(#[from] XmlError),

    // === Structure ===
    #[error("element {element} carries more than one of rdf:about, rdf:ID and rdf:nodeID")]
    ConflictingIdentity { element: String },

    #[error("attribute {attribute} is not allowed on {context} element {element}")]
    IllegalAttribute {
        attribute: String,
        element: String,
        context: &'static str,
    },

    #[error("element {element} has no namespace")]
    UnqualifiedElement { element: String },

    #[error("attribute {attribute} on element {element} has no namespace")]
    UnqualifiedAttribute { attribute: String, element: String },

    #[error("{element} cannot be used as a {context} element")]
    ReservedElement {
        element: String,
        context: &'static str,
    },

    #[error("unexpected text {text:?} inside element {element}")]
    UnexpectedText { element: String, text: String },

    #[error("property element {element} contains more than one node element")]
    MultipleNodeElements { element: String },

    #[error("invalid rdf:nodeID {id:?}")]
    InvalidNodeId { id: String },

    #[error("rdf:ID {iri:?} is used more than once")]
    DuplicateId { iri: String },

    // === Lookup ===
    #[error("proxy {0} does not occur in any statement")]
    UnknownProxy(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ProcessError {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::InvalidIri { .. } | ProcessError::Xml(_) => ErrorKind::Syntax,
            ProcessError::UnknownProxy(_) => ErrorKind::Lookup,
            _ => ErrorKind::Structure,
        }
    }
}

/// Error while turning resources into an RDF/XML tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("IRI {iri:?} cannot be split into a namespace and an XML local name")]
    UnsplittableIri { iri: String },

    #[error("{iri} is an RDF/XML syntax term and cannot be used as a predicate")]
    ReservedPredicate { iri: String },

    #[error("blank node {resource} cannot be used as a predicate")]
    BlankPredicate { resource: String },

    #[error("invalid base IRI {iri:?}: {message}")]
    InvalidBase { iri: String, message: String },

    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Error from the storage wrapper.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("location {location:?} is not a relative path below the store root")]
    InvalidLocation { location: String },

    #[error("no resource of type {type_uri} in {location}")]
    NotFound { location: String, type_uri: String },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Xml(#[from] XmlError),
}
