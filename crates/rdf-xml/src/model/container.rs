//! RDF containers (`rdf:Seq`, `rdf:Bag`) and their member properties.

use crate::error::ModelError;
use crate::model::{Graph, ResourceId, ResourceKind, Value};
use crate::vocab::{rdf, RDF_NS};

/// Index of a container member property (`rdf:_N`).
///
/// Returns `None` when `uri` is not of the `rdf:_` form at all, and an error
/// when it is but `N` is not a positive integer without leading zeros.
pub fn member_index(uri: &str) -> Option<Result<u32, ModelError>> {
    let suffix = uri.strip_prefix(RDF_NS)?.strip_prefix('_')?;
    let valid = !suffix.is_empty()
        && !suffix.starts_with('0')
        && suffix.bytes().all(|b| b.is_ascii_digit());
    Some(
        suffix
            .parse::<u32>()
            .ok()
            .filter(|_| valid)
            .ok_or_else(|| ModelError::MalformedMemberProperty {
                uri: uri.to_string(),
            }),
    )
}

/// IRI of the `n`-th member property.
pub fn member_property_uri(n: u32) -> String {
    format!("{RDF_NS}_{n}")
}

/// Common container behavior over `rdf:_N` properties.
pub trait RdfContainer {
    /// The container resource.
    fn id(&self) -> ResourceId;

    /// Member values in stored order.
    fn item_list(&self, graph: &Graph) -> Vec<Value> {
        graph
            .properties(self.id())
            .iter()
            .filter(|pv| {
                graph
                    .uri(pv.property)
                    .and_then(member_index)
                    .is_some_and(|index| index.is_ok())
            })
            .map(|pv| pv.value.clone())
            .collect()
    }

    /// Number of members.
    fn len(&self, graph: &Graph) -> usize {
        self.item_list(graph).len()
    }

    fn is_empty(&self, graph: &Graph) -> bool {
        self.len(graph) == 0
    }

    /// Appends a member under the next free index and returns that index.
    fn add_item(&self, graph: &mut Graph, value: Value) -> Result<u32, ModelError> {
        let next = graph
            .properties(self.id())
            .iter()
            .filter_map(|pv| graph.uri(pv.property).and_then(member_index))
            .filter_map(Result::ok)
            .max()
            .unwrap_or(0)
            + 1;
        let property = graph.locate_resource(&member_property_uri(next));
        graph.add_property(self.id(), property, value)?;
        Ok(next)
    }

    /// The member stored under index `n`.
    fn item<'g>(&self, graph: &'g Graph, n: u32) -> Option<&'g Value> {
        graph.first_value(self.id(), &member_property_uri(n))
    }
}

/// Typed view of an `rdf:Seq` resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqResource(ResourceId);

impl SeqResource {
    /// Creates (or locates, for a known IRI) a sequence and types it.
    pub fn create(graph: &mut Graph, uri: Option<&str>) -> Result<Self, ModelError> {
        let id = create_container(graph, uri, ResourceKind::Seq, rdf::SEQ)?;
        Self::from_resource(graph, id)
    }

    /// Views an existing resource as a sequence.
    pub fn from_resource(graph: &Graph, id: ResourceId) -> Result<Self, ModelError> {
        expect_kind(graph, id, ResourceKind::Seq).map(Self)
    }
}

impl RdfContainer for SeqResource {
    fn id(&self) -> ResourceId {
        self.0
    }
}

/// Typed view of an `rdf:Bag` resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BagResource(ResourceId);

impl BagResource {
    /// Creates (or locates, for a known IRI) a bag and types it.
    pub fn create(graph: &mut Graph, uri: Option<&str>) -> Result<Self, ModelError> {
        let id = create_container(graph, uri, ResourceKind::Bag, rdf::BAG)?;
        Self::from_resource(graph, id)
    }

    pub fn from_resource(graph: &Graph, id: ResourceId) -> Result<Self, ModelError> {
        expect_kind(graph, id, ResourceKind::Bag).map(Self)
    }
}

impl RdfContainer for BagResource {
    fn id(&self) -> ResourceId {
        self.0
    }
}

fn create_container(
    graph: &mut Graph,
    uri: Option<&str>,
    kind: ResourceKind,
    type_uri: &str,
) -> Result<ResourceId, ModelError> {
    let id = graph.create_resource(uri, kind);
    let rdf_type = graph.locate_resource(rdf::TYPE);
    let container_type = graph.locate_resource(type_uri);
    graph.add_property(id, rdf_type, Value::Resource(container_type))?;
    Ok(id)
}

pub(crate) fn expect_kind(
    graph: &Graph,
    id: ResourceId,
    kind: ResourceKind,
) -> Result<ResourceId, ModelError> {
    if graph.kind(id) == kind {
        Ok(id)
    } else {
        Err(ModelError::WrongKind {
            resource: graph.describe(id),
            expected: kind.name(),
        })
    }
}
