//! Well-known namespaces and RDF/XML syntax terms.

use std::collections::HashSet;

use lazy_static::lazy_static;

/// The RDF syntax namespace.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// The XML namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Schema datatypes.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// RDF Schema.
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";

/// RDF vocabulary IRIs.
pub mod rdf {
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const VALUE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#value";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
    pub const LIST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#List";
    pub const BAG: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Bag";
    pub const SEQ: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Seq";
    pub const STATEMENT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Statement";
    pub const SUBJECT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#subject";
    pub const PREDICATE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#predicate";
    pub const OBJECT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#object";
    pub const XML_LITERAL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral";
}

/// RDF Schema IRIs.
pub mod rdfs {
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
}

/// XML Schema datatype IRIs used by typed literal constructors.
pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
}

lazy_static! {
    /// RDF attributes with syntactic meaning; they never become property attributes.
    pub static ref RESERVED_ATTRIBUTES: HashSet<&'static str> =
        ["about", "ID", "parseType", "resource", "nodeID", "datatype"]
            .into_iter()
            .collect();

    /// RDF names that may not name a property element.
    pub static ref FORBIDDEN_PROPERTY_NAMES: HashSet<&'static str> = [
        "RDF",
        "Description",
        "ID",
        "about",
        "parseType",
        "resource",
        "nodeID",
        "datatype",
        "aboutEach",
        "aboutEachPrefix",
        "bagID",
    ]
    .into_iter()
    .collect();

    /// RDF names that may not name a node element.
    pub static ref FORBIDDEN_NODE_NAMES: HashSet<&'static str> = [
        "RDF",
        "ID",
        "about",
        "parseType",
        "resource",
        "nodeID",
        "datatype",
        "li",
        "aboutEach",
        "aboutEachPrefix",
        "bagID",
    ]
    .into_iter()
    .collect();
}

/// Returns true if `local` is an RDF/XML reserved attribute local name.
pub fn is_reserved_attribute(local: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(local)
}

/// Returns true if the RDF name `local` may be written as a property attribute.
pub fn is_property_attribute(local: &str) -> bool {
    local != "li" && !FORBIDDEN_PROPERTY_NAMES.contains(local)
}
