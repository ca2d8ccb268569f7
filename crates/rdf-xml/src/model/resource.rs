//! Resource handles, kinds and property values.

use std::fmt;

use crate::model::Literal;

/// Handle to a resource owned by a [`Graph`](crate::model::Graph).
///
/// Handles are plain indices: they never own the resource they point at, so
/// cycles (a list cell pointing at itself, two people who know each other)
/// need no special treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

impl ResourceId {
    /// Position of the resource in its graph.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Specialized behavior a resource was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceKind {
    #[default]
    Resource,
    /// A cell of an `rdf:first`/`rdf:rest` chain, or `rdf:nil`.
    List,
    /// An `rdf:Bag` container.
    Bag,
    /// An `rdf:Seq` container; members stay sorted by index.
    Seq,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Resource => "resource",
            ResourceKind::List => "list",
            ResourceKind::Bag => "bag",
            ResourceKind::Seq => "seq",
        }
    }
}

/// Object of a property: another resource or a literal.
///
/// Equality here is identity for resources; use
/// [`Graph::values_equal`](crate::model::Graph::values_equal) for the
/// graph-aware comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Resource(ResourceId),
    Literal(Literal),
}

impl Value {
    pub fn as_resource(&self) -> Option<ResourceId> {
        match self {
            Value::Resource(id) => Some(*id),
            Value::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Literal(literal) => Some(literal),
            Value::Resource(_) => None,
        }
    }
}

impl From<ResourceId> for Value {
    fn from(id: ResourceId) -> Self {
        Value::Resource(id)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Value::Literal(literal)
    }
}

/// One property of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyValue {
    pub property: ResourceId,
    pub value: Value,
}

/// Stored state of a resource.
#[derive(Debug, Clone)]
pub struct Resource {
    pub(crate) uri: Option<String>,
    pub(crate) kind: ResourceKind,
    pub(crate) properties: Vec<PropertyValue>,
}

impl Resource {
    pub(crate) fn new(uri: Option<String>, kind: ResourceKind) -> Self {
        Self {
            uri,
            kind,
            properties: Vec::new(),
        }
    }

    /// The IRI, or `None` for a blank node.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_blank(&self) -> bool {
        self.uri.is_none()
    }

    /// Properties in insertion order (member order for sequences).
    pub fn properties(&self) -> &[PropertyValue] {
        &self.properties
    }
}
