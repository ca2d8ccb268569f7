//! The resource graph: owns every resource and hands out [`ResourceId`]s.

use std::cmp::Ordering;
use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::error::{FactoryError, ModelError};
use crate::model::container::member_index;
use crate::model::{Literal, PropertyValue, Resource, ResourceId, ResourceKind, Value};
use crate::vocab::{rdf, RDF_NS};

/// Creates specialized resources for the types of one namespace.
///
/// Given the IRI of the resource being created (`None` for a blank node) and
/// the local name of its type, a factory picks the [`ResourceKind`] to use.
/// `Ok(None)` means "no special kind"; an error is logged and the default
/// kind is used, so factory failures never stop processing.
pub trait ResourceFactory: Send + Sync {
    fn create(&self, uri: Option<&str>, type_local: &str)
        -> Result<Option<ResourceKind>, FactoryError>;
}

impl<F> ResourceFactory for F
where
    F: Fn(Option<&str>, &str) -> Result<Option<ResourceKind>, FactoryError> + Send + Sync,
{
    fn create(
        &self,
        uri: Option<&str>,
        type_local: &str,
    ) -> Result<Option<ResourceKind>, FactoryError> {
        self(uri, type_local)
    }
}

/// Built-in factory for the RDF namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdfFactory;

impl ResourceFactory for RdfFactory {
    fn create(
        &self,
        _uri: Option<&str>,
        type_local: &str,
    ) -> Result<Option<ResourceKind>, FactoryError> {
        Ok(match type_local {
            "Seq" => Some(ResourceKind::Seq),
            "Bag" => Some(ResourceKind::Bag),
            "List" => Some(ResourceKind::List),
            _ => None,
        })
    }
}

/// An in-memory set of resources and their properties.
///
/// Resources with an IRI are unique per graph: [`Graph::locate_resource`]
/// returns the existing handle when the IRI is already known. Blank nodes
/// are always fresh. `rdf:nil` exists from the start as an empty list.
pub struct Graph {
    resources: Vec<Resource>,
    by_uri: FxHashMap<String, ResourceId>,
    factories: FxHashMap<String, Box<dyn ResourceFactory>>,
    nil: ResourceId,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut namespaces: Vec<_> = self.factories.keys().collect();
        namespaces.sort();
        f.debug_struct("Graph")
            .field("resources", &self.resources.len())
            .field("factories", &namespaces)
            .finish()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates a graph holding only `rdf:nil`, with the RDF factory registered.
    pub fn new() -> Self {
        let mut graph = Self {
            resources: Vec::new(),
            by_uri: FxHashMap::default(),
            factories: FxHashMap::default(),
            nil: ResourceId(0),
        };
        graph.nil = graph.insert(Some(rdf::NIL.to_string()), ResourceKind::List);
        graph.register_resource_factory(RDF_NS, RdfFactory);
        graph
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Number of resources, `rdf:nil` included.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True when nothing but `rdf:nil` exists.
    pub fn is_empty(&self) -> bool {
        self.resources.len() <= 1
    }

    /// The resource behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this graph. The same holds for
    /// every accessor taking a [`ResourceId`]; use [`Graph::try_resource`]
    /// for handles of unknown origin.
    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.index()]
    }

    /// The resource behind `id`, or `None` if this graph has no such handle.
    pub fn try_resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub fn uri(&self, id: ResourceId) -> Option<&str> {
        self.resource(id).uri()
    }

    pub fn kind(&self, id: ResourceId) -> ResourceKind {
        self.resource(id).kind()
    }

    pub fn is_blank(&self, id: ResourceId) -> bool {
        self.resource(id).is_blank()
    }

    /// The handle of the resource with this IRI, if any.
    pub fn get(&self, uri: &str) -> Option<ResourceId> {
        self.by_uri.get(uri).copied()
    }

    /// The empty list.
    pub fn nil(&self) -> ResourceId {
        self.nil
    }

    pub fn is_nil(&self, id: ResourceId) -> bool {
        self.uri(id) == Some(rdf::NIL)
    }

    /// Every resource handle in creation order.
    pub fn resource_ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        (0..self.resources.len() as u32).map(ResourceId)
    }

    /// A short human-readable label: `<iri>` or `_:bN`.
    pub fn describe(&self, id: ResourceId) -> String {
        match self.uri(id) {
            Some(uri) => format!("<{uri}>"),
            None => format!("_:b{}", id.0),
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Returns the resource with this IRI, creating a plain one if needed.
    pub fn locate_resource(&mut self, uri: &str) -> ResourceId {
        self.create_resource(Some(uri), ResourceKind::Resource)
    }

    /// Returns the resource with this IRI, creating it through the factory
    /// registered for `type_namespace` if needed. A new resource gets its
    /// `rdf:type` property.
    pub fn locate_typed_resource(
        &mut self,
        uri: &str,
        type_namespace: &str,
        type_local: &str,
    ) -> ResourceId {
        match self.get(uri) {
            Some(id) => id,
            None => self.create_typed(Some(uri), type_namespace, type_local),
        }
    }

    /// Creates a fresh blank node.
    pub fn create_blank(&mut self) -> ResourceId {
        self.insert(None, ResourceKind::Resource)
    }

    /// Creates a fresh blank node through the factory for `type_namespace`.
    pub fn create_typed_blank(&mut self, type_namespace: &str, type_local: &str) -> ResourceId {
        self.create_typed(None, type_namespace, type_local)
    }

    /// Creates a resource of an explicit kind. An already known IRI returns
    /// the existing resource unchanged.
    pub fn create_resource(&mut self, uri: Option<&str>, kind: ResourceKind) -> ResourceId {
        if let Some(id) = uri.and_then(|u| self.get(u)) {
            return id;
        }
        self.insert(uri.map(str::to_string), kind)
    }

    fn create_typed(
        &mut self,
        uri: Option<&str>,
        type_namespace: &str,
        type_local: &str,
    ) -> ResourceId {
        let kind = match self.factories.get(type_namespace) {
            Some(factory) => match factory.create(uri, type_local) {
                Ok(kind) => kind.unwrap_or_default(),
                Err(err) => {
                    warn!(
                        namespace = type_namespace,
                        local = type_local,
                        error = %err,
                        "resource factory failed, using a plain resource"
                    );
                    ResourceKind::Resource
                }
            },
            None => ResourceKind::Resource,
        };

        let id = self.insert(uri.map(str::to_string), kind);
        let rdf_type = self.locate_resource(rdf::TYPE);
        let type_resource = self.locate_resource(&format!("{type_namespace}{type_local}"));
        self.resources[id.index()].properties.push(PropertyValue {
            property: rdf_type,
            value: Value::Resource(type_resource),
        });
        id
    }

    fn insert(&mut self, uri: Option<String>, kind: ResourceKind) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        if let Some(uri) = &uri {
            self.by_uri.insert(uri.clone(), id);
        }
        trace!(id = id.0, uri = uri.as_deref(), kind = kind.name(), "created resource");
        self.resources.push(Resource::new(uri, kind));
        id
    }

    // =========================================================================
    // Factories
    // =========================================================================

    /// Registers the factory for a type namespace, returning the one it replaces.
    pub fn register_resource_factory(
        &mut self,
        namespace: impl Into<String>,
        factory: impl ResourceFactory + 'static,
    ) -> Option<Box<dyn ResourceFactory>> {
        self.factories.insert(namespace.into(), Box::new(factory))
    }

    /// Removes the factory for a type namespace.
    pub fn unregister_resource_factory(
        &mut self,
        namespace: &str,
    ) -> Option<Box<dyn ResourceFactory>> {
        self.factories.remove(namespace)
    }

    pub fn has_factory(&self, namespace: &str) -> bool {
        self.factories.contains_key(namespace)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// All properties of a resource.
    pub fn properties(&self, id: ResourceId) -> &[PropertyValue] {
        self.resource(id).properties()
    }

    /// Values of one property, in stored order.
    pub fn property_values(
        &self,
        id: ResourceId,
        property: ResourceId,
    ) -> impl Iterator<Item = &Value> + '_ {
        self.properties(id)
            .iter()
            .filter(move |pv| pv.property == property)
            .map(|pv| &pv.value)
    }

    /// Values of the property with this IRI.
    pub fn values<'g>(&'g self, id: ResourceId, property_uri: &str) -> Vec<&'g Value> {
        match self.get(property_uri) {
            Some(property) => self.property_values(id, property).collect(),
            None => Vec::new(),
        }
    }

    /// First value of the property with this IRI.
    pub fn first_value(&self, id: ResourceId, property_uri: &str) -> Option<&Value> {
        let property = self.get(property_uri)?;
        self.property_values(id, property).next()
    }

    /// Adds a property value. Returns `Ok(false)` without changing anything
    /// when an equal value is already stored under the same property.
    ///
    /// Sequences validate `rdf:_N` properties and keep their members sorted.
    pub fn add_property(
        &mut self,
        id: ResourceId,
        property: ResourceId,
        value: Value,
    ) -> Result<bool, ModelError> {
        let is_seq = self.kind(id) == ResourceKind::Seq;
        if is_seq {
            if let Some(index) = self.uri(property).and_then(member_index) {
                index?;
            }
        }

        let duplicate = self
            .properties(id)
            .iter()
            .any(|pv| pv.property == property && self.values_equal(&pv.value, &value));
        if duplicate {
            return Ok(false);
        }

        self.resources[id.index()]
            .properties
            .push(PropertyValue { property, value });
        if is_seq {
            self.sort_members(id);
        }
        Ok(true)
    }

    /// [`Graph::add_property`] with the property given by IRI.
    pub fn add_property_uri(
        &mut self,
        id: ResourceId,
        property_uri: &str,
        value: impl Into<Value>,
    ) -> Result<bool, ModelError> {
        let property = self.locate_resource(property_uri);
        self.add_property(id, property, value.into())
    }

    /// Replaces every value of `property` with `value`.
    pub fn set_property(
        &mut self,
        id: ResourceId,
        property: ResourceId,
        value: Value,
    ) -> Result<(), ModelError> {
        self.remove_all(id, property);
        self.add_property(id, property, value).map(|_| ())
    }

    /// Removes one property value; returns whether it was present.
    pub fn remove_property(&mut self, id: ResourceId, property: ResourceId, value: &Value) -> bool {
        let position = self
            .properties(id)
            .iter()
            .position(|pv| pv.property == property && self.values_equal(&pv.value, value));
        match position {
            Some(position) => {
                self.resources[id.index()].properties.remove(position);
                true
            }
            None => false,
        }
    }

    /// Removes every value of `property`; returns how many were removed.
    pub fn remove_all(&mut self, id: ResourceId, property: ResourceId) -> usize {
        let properties = &mut self.resources[id.index()].properties;
        let before = properties.len();
        properties.retain(|pv| pv.property != property);
        before - properties.len()
    }

    /// Removes every property of a resource.
    pub fn clear_properties(&mut self, id: ResourceId) {
        self.resources[id.index()].properties.clear();
    }

    /// Resources this resource is typed with.
    pub fn types(&self, id: ResourceId) -> Vec<ResourceId> {
        self.values(id, rdf::TYPE)
            .into_iter()
            .filter_map(Value::as_resource)
            .collect()
    }

    /// Returns true if the resource has an `rdf:type` with this IRI.
    pub fn has_type(&self, id: ResourceId, type_uri: &str) -> bool {
        self.types(id)
            .into_iter()
            .any(|t| self.uri(t) == Some(type_uri))
    }

    // =========================================================================
    // Equality
    // =========================================================================

    /// Resource equality.
    ///
    /// Resources with IRIs are equal when the IRIs are. Two blank nodes are
    /// equal when they are the same node, or when both carry an `rdf:value`
    /// literal and those literals are equal.
    pub fn resources_equal(&self, a: ResourceId, b: ResourceId) -> bool {
        if a == b {
            return true;
        }
        match (self.uri(a), self.uri(b)) {
            (Some(x), Some(y)) => x == y,
            (None, None) => match (self.value_literal(a), self.value_literal(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
            _ => false,
        }
    }

    /// Property value equality: literals by value, resources by
    /// [`Graph::resources_equal`].
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Literal(x), Value::Literal(y)) => x == y,
            (Value::Resource(x), Value::Resource(y)) => self.resources_equal(*x, *y),
            _ => false,
        }
    }

    fn value_literal(&self, id: ResourceId) -> Option<&Literal> {
        self.first_value(id, rdf::VALUE).and_then(Value::as_literal)
    }

    // =========================================================================
    // Sequences
    // =========================================================================

    fn sort_members(&mut self, id: ResourceId) {
        let mut properties = std::mem::take(&mut self.resources[id.index()].properties);
        properties.sort_by(|a, b| self.member_order(a, b));
        self.resources[id.index()].properties = properties;
    }

    /// Members by index first, everything else after them by property IRI.
    fn member_order(&self, a: &PropertyValue, b: &PropertyValue) -> Ordering {
        let index = |pv: &PropertyValue| {
            self.uri(pv.property)
                .and_then(member_index)
                .and_then(Result::ok)
        };
        match (index(a), index(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.uri(a.property).cmp(&self.uri(b.property)),
        }
    }
}
