//! RDF/XML generator: resources -> XML tree.
//!
//! The generator writes each resource as a node element. A resource
//! referenced exactly once is nested inside the property that references
//! it; shared blank nodes get an `rdf:nodeID`. Typed resources use their
//! type as element name, and plain literals become attributes when that
//! does not change meaning.

use oxiri::Iri;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::codec::iri::{self, split_iri};
use crate::codec::namespaces::PrefixMap;
use crate::error::GenerateError;
use crate::model::{Graph, Literal, ResourceId, ResourceKind, Value};
use crate::vocab::{rdf, FORBIDDEN_NODE_NAMES, FORBIDDEN_PROPERTY_NAMES, RDF_NS, XML_NS};
use crate::xml::{Document, Element, NamespaceDecl, QName, XmlNode};

// =============================================================================
// Options
// =============================================================================

/// Output choices for [`RdfXmlGenerator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Write every language-less plain literal as an attribute when possible.
    pub compact_literals: bool,
    /// Namespaces whose language-less plain literals become attributes even
    /// when `compact_literals` is off.
    pub compact_namespaces: FxHashSet<String>,
    /// Write well-formed lists as `rdf:parseType="Collection"`.
    pub compact_lists: bool,
    /// IRIs are written relative to this base, which is emitted as `xml:base`.
    pub base_uri: Option<String>,
    /// Preferred prefixes, applied over the built-in ones.
    pub prefixes: Vec<(String, String)>,
}

impl GeneratorOptions {
    /// Options that write every property as an element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that use attributes and collections wherever possible.
    pub fn compact() -> Self {
        Self {
            compact_literals: true,
            compact_lists: true,
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_uri = Some(base.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.prefixes.push((prefix.into(), namespace.into()));
        self
    }

    pub fn with_compact_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.compact_namespaces.insert(namespace.into());
        self
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Writes resources as an RDF/XML tree.
#[derive(Debug, Default)]
pub struct RdfXmlGenerator {
    options: GeneratorOptions,
    prefixes: PrefixMap,
    base: Option<Iri<String>>,
    /// Namespaces used by the current document, in first-use order.
    used_namespaces: Vec<String>,
    /// Referrers of each resource, one entry per referencing property value.
    references: FxHashMap<ResourceId, Vec<ResourceId>>,
    /// Resources reachable from the roots, in discovery order.
    discovered: Vec<ResourceId>,
    /// Cells of lists written as collections.
    list_cells: FxHashSet<ResourceId>,
    serialized: FxHashSet<ResourceId>,
    node_ids: FxHashMap<ResourceId, String>,
    node_id_counter: u32,
}

impl RdfXmlGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Writes every resource of the graph that has properties.
    ///
    /// Top-level nodes are the named resources plus the blank nodes nothing
    /// refers to; everything else is nested where it is referenced.
    pub fn create_graph_document(&mut self, graph: &Graph) -> Result<Document, GenerateError> {
        self.reset()?;
        let candidates: Vec<ResourceId> = graph
            .resource_ids()
            .filter(|id| !graph.properties(*id).is_empty())
            .collect();
        self.count_references(graph, &candidates);
        let roots: Vec<ResourceId> = candidates
            .into_iter()
            .filter(|id| !graph.is_blank(*id) || self.reference_count(*id) == 0)
            .collect();
        self.emit(graph, &roots)
    }

    /// Writes `roots` and everything reachable from them.
    pub fn create_document(
        &mut self,
        graph: &Graph,
        roots: &[ResourceId],
    ) -> Result<Document, GenerateError> {
        self.reset()?;
        self.count_references(graph, roots);
        self.emit(graph, roots)
    }

    fn reset(&mut self) -> Result<(), GenerateError> {
        self.prefixes = PrefixMap::new();
        for (prefix, namespace) in &self.options.prefixes {
            self.prefixes.insert(prefix.clone(), namespace.clone());
        }
        self.base = match &self.options.base_uri {
            Some(base) => Some(Iri::parse(base.clone()).map_err(|e| {
                GenerateError::InvalidBase {
                    iri: base.clone(),
                    message: e.to_string(),
                }
            })?),
            None => None,
        };
        self.used_namespaces.clear();
        self.references.clear();
        self.discovered.clear();
        self.list_cells.clear();
        self.serialized.clear();
        self.node_ids.clear();
        self.node_id_counter = 0;
        Ok(())
    }

    // =========================================================================
    // Reference counting
    // =========================================================================

    /// Walks everything reachable from `roots`, recording who refers to whom.
    fn count_references(&mut self, graph: &Graph, roots: &[ResourceId]) {
        let mut seen: FxHashSet<ResourceId> = FxHashSet::default();
        let mut stack: Vec<ResourceId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            self.discovered.push(id);
            let mut targets = Vec::new();
            for pv in graph.properties(id) {
                if let Value::Resource(target) = pv.value {
                    self.references.entry(target).or_default().push(id);
                    targets.push(target);
                }
            }
            stack.extend(targets.into_iter().rev());
        }

        if self.options.compact_lists {
            for id in &self.discovered {
                if let Some(head) = self.collection_head(graph, *id) {
                    let cells = self.collection_cells(graph, head);
                    self.list_cells.extend(cells);
                }
            }
        }
        debug!(
            resources = self.discovered.len(),
            collections = self.list_cells.len(),
            "counted references"
        );
    }

    fn reference_count(&self, id: ResourceId) -> usize {
        self.references.get(&id).map_or(0, Vec::len)
    }

    // =========================================================================
    // Document
    // =========================================================================

    fn emit(&mut self, graph: &Graph, roots: &[ResourceId]) -> Result<Document, GenerateError> {
        let mut root = Element::new(self.qname(RDF_NS, "RDF"));
        for id in roots {
            if !self.serialized.contains(id) {
                let node = self.node_element(graph, *id, true)?;
                root.push(XmlNode::Element(node));
            }
        }
        // Resources only reachable through a cycle of single references.
        let pending: Vec<ResourceId> = self.discovered.clone();
        for id in pending {
            if !self.serialized.contains(&id)
                && !self.list_cells.contains(&id)
                && !graph.properties(id).is_empty()
            {
                let node = self.node_element(graph, id, true)?;
                root.push(XmlNode::Element(node));
            }
        }

        if let Some(base) = &self.base {
            root.set_attribute(
                QName::qualified("xml", XML_NS, "base"),
                base.as_str().to_string(),
            );
        }
        for namespace in &self.used_namespaces {
            if let Some(prefix) = self.prefixes.prefix_for(namespace) {
                root.namespaces.push(NamespaceDecl {
                    prefix: Some(prefix.to_string()),
                    uri: namespace.clone(),
                });
            }
        }
        debug!(
            nodes = root.children.len(),
            namespaces = root.namespaces.len(),
            "generated document"
        );
        Ok(Document::new(root))
    }

    fn node_element(
        &mut self,
        graph: &Graph,
        id: ResourceId,
        top_level: bool,
    ) -> Result<Element, GenerateError> {
        self.serialized.insert(id);

        let type_property = graph.get(rdf::TYPE);
        let element_type = graph.types(id).into_iter().find_map(|t| {
            let (namespace, local) = split_iri(graph.uri(t)?)?;
            let reserved = namespace == RDF_NS
                && (FORBIDDEN_NODE_NAMES.contains(local) || local == "Description");
            (!reserved).then_some((t, namespace, local))
        });

        let mut element = match element_type {
            Some((_, namespace, local)) => Element::new(self.qname(namespace, local)),
            None => Element::new(self.qname(RDF_NS, "Description")),
        };
        match graph.uri(id) {
            Some(uri) => {
                let about = self.relative(uri);
                element.set_attribute(self.qname(RDF_NS, "about"), about);
            }
            None => {
                let refs = self.reference_count(id);
                if refs > 1 || (top_level && refs >= 1) || self.node_ids.contains_key(&id) {
                    let node_id = self.node_id(id);
                    element.set_attribute(self.qname(RDF_NS, "nodeID"), node_id);
                }
            }
        }

        let mut type_consumed = false;
        for pv in graph.properties(id) {
            if !type_consumed
                && Some(pv.property) == type_property
                && element_type.is_some_and(|(t, _, _)| pv.value == Value::Resource(t))
            {
                type_consumed = true;
                continue;
            }
            self.property(graph, &mut element, pv.property, &pv.value)?;
        }
        Ok(element)
    }

    fn property(
        &mut self,
        graph: &Graph,
        subject: &mut Element,
        property: ResourceId,
        value: &Value,
    ) -> Result<(), GenerateError> {
        let Some(property_uri) = graph.uri(property) else {
            return Err(GenerateError::BlankPredicate {
                resource: graph.describe(property),
            });
        };
        let Some((namespace, local)) = split_iri(property_uri) else {
            return Err(GenerateError::UnsplittableIri {
                iri: property_uri.to_string(),
            });
        };
        if namespace == RDF_NS && (FORBIDDEN_PROPERTY_NAMES.contains(local) || local == "li") {
            return Err(GenerateError::ReservedPredicate {
                iri: property_uri.to_string(),
            });
        }

        match value {
            Value::Literal(literal) => {
                if self.as_attribute(literal, property_uri, namespace) {
                    let name = self.qname(namespace, local);
                    if !subject.has_attribute_named(&name) {
                        subject.set_attribute(name, literal.lexical_form());
                        return Ok(());
                    }
                }
                let element = self.literal_element(namespace, local, literal);
                subject.push(XmlNode::Element(element));
            }
            Value::Resource(target) => {
                let element = self.resource_element(graph, namespace, local, *target)?;
                subject.push(XmlNode::Element(element));
            }
        }
        Ok(())
    }

    fn as_attribute(&self, literal: &Literal, property_uri: &str, namespace: &str) -> bool {
        matches!(literal, Literal::Plain(plain)
            if plain.language().is_none() && !plain.lexical().contains(['\n', '\t', '\r']))
            && property_uri != rdf::TYPE
            && (self.options.compact_literals || self.options.compact_namespaces.contains(namespace))
    }

    fn literal_element(&mut self, namespace: &str, local: &str, literal: &Literal) -> Element {
        let mut element = Element::new(self.qname(namespace, local));
        match literal {
            Literal::Plain(plain) => {
                // An attribute-free empty element reads back as a blank node.
                match plain.language() {
                    Some(language) => {
                        element.set_attribute(QName::qualified("xml", XML_NS, "lang"), language)
                    }
                    None if plain.lexical().is_empty() => {
                        element.set_attribute(QName::qualified("xml", XML_NS, "lang"), "")
                    }
                    None => {}
                }
                push_text(&mut element, plain.lexical());
            }
            Literal::Typed(typed) => {
                let datatype = self.relative(typed.datatype());
                element.set_attribute(self.qname(RDF_NS, "datatype"), datatype);
                push_text(&mut element, typed.lexical());
            }
            Literal::Xml(xml) => {
                element.set_attribute(self.qname(RDF_NS, "parseType"), "Literal");
                element.preserve_whitespace = true;
                for node in xml.nodes() {
                    let mut node = node.clone();
                    if let XmlNode::Element(child) = &mut node {
                        child.declare_used_namespaces();
                    }
                    element.push(node);
                }
            }
        }
        element
    }

    fn resource_element(
        &mut self,
        graph: &Graph,
        namespace: &str,
        local: &str,
        target: ResourceId,
    ) -> Result<Element, GenerateError> {
        let mut element = Element::new(self.qname(namespace, local));

        if self.list_cells.contains(&target) && !self.serialized.contains(&target) {
            element.set_attribute(self.qname(RDF_NS, "parseType"), "Collection");
            let cells = self.collection_cells(graph, target);
            for cell in &cells {
                self.serialized.insert(*cell);
            }
            for cell in cells {
                let Some(Value::Resource(item)) = graph.first_value(cell, rdf::FIRST) else {
                    continue;
                };
                let node = if self.serialized.contains(item) {
                    self.reference_node(graph, *item)
                } else {
                    self.node_element(graph, *item, false)?
                };
                element.push(XmlNode::Element(node));
            }
            return Ok(element);
        }

        let has_properties = !graph.properties(target).is_empty();
        let refs = self.reference_count(target);
        let unserialized = !self.serialized.contains(&target);

        if unserialized && has_properties && (refs <= 1 || graph.uri(target).is_some()) {
            let node = self.node_element(graph, target, false)?;
            element.push(XmlNode::Element(node));
        } else if unserialized && !has_properties && graph.is_blank(target) && refs <= 1 {
            element.set_attribute(self.qname(RDF_NS, "parseType"), "Resource");
            self.serialized.insert(target);
        } else {
            match graph.uri(target) {
                Some(uri) => {
                    let resource = self.relative(uri);
                    element.set_attribute(self.qname(RDF_NS, "resource"), resource);
                }
                None => {
                    let node_id = self.node_id(target);
                    element.set_attribute(self.qname(RDF_NS, "nodeID"), node_id);
                }
            }
        }
        Ok(element)
    }

    /// `<rdf:Description rdf:about=".."/>` standing for a resource written elsewhere.
    fn reference_node(&mut self, graph: &Graph, id: ResourceId) -> Element {
        let mut element = Element::new(self.qname(RDF_NS, "Description"));
        match graph.uri(id) {
            Some(uri) => {
                let about = self.relative(uri);
                element.set_attribute(self.qname(RDF_NS, "about"), about);
            }
            None => {
                let node_id = self.node_id(id);
                element.set_attribute(self.qname(RDF_NS, "nodeID"), node_id);
            }
        }
        element
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Returns `id` if it heads a list that can be written as a collection:
    /// blank cells referenced once, holding exactly one `rdf:first` and one
    /// `rdf:rest`, ending at `rdf:nil`, with resource items. A typed cell is
    /// written as plain first/rest since a collection cannot carry its type.
    fn collection_head(&self, graph: &Graph, id: ResourceId) -> Option<ResourceId> {
        if graph.kind(id) != ResourceKind::List || graph.is_nil(id) {
            return None;
        }
        let mut seen = FxHashSet::default();
        let mut cell = id;
        while !graph.is_nil(cell) {
            if !seen.insert(cell) || !self.is_collection_cell(graph, cell) {
                return None;
            }
            cell = graph.first_value(cell, rdf::REST)?.as_resource()?;
        }
        Some(id)
    }

    fn is_collection_cell(&self, graph: &Graph, cell: ResourceId) -> bool {
        if !graph.is_blank(cell) || self.reference_count(cell) != 1 {
            return false;
        }
        let (mut first, mut rest) = (0, 0);
        for pv in graph.properties(cell) {
            match (graph.uri(pv.property), &pv.value) {
                (Some(rdf::FIRST), Value::Resource(_)) => first += 1,
                (Some(rdf::REST), Value::Resource(_)) => rest += 1,
                _ => return false,
            }
        }
        first == 1 && rest == 1
    }

    fn collection_cells(&self, graph: &Graph, head: ResourceId) -> Vec<ResourceId> {
        let mut cells = Vec::new();
        let mut cell = head;
        while !graph.is_nil(cell) && !cells.contains(&cell) {
            cells.push(cell);
            match graph.first_value(cell, rdf::REST).and_then(Value::as_resource) {
                Some(next) => cell = next,
                None => break,
            }
        }
        cells
    }

    // =========================================================================
    // Names
    // =========================================================================

    fn qname(&mut self, namespace: &str, local: &str) -> QName {
        let prefix = self.prefixes.assign(namespace);
        if !self.used_namespaces.iter().any(|ns| ns == namespace) {
            self.used_namespaces.push(namespace.to_string());
        }
        QName::qualified(&prefix, namespace, local)
    }

    fn relative(&self, iri: &str) -> String {
        match &self.base {
            Some(base) => iri::relativize(base, iri),
            None => iri.to_string(),
        }
    }

    fn node_id(&mut self, id: ResourceId) -> String {
        if let Some(node_id) = self.node_ids.get(&id) {
            return node_id.clone();
        }
        self.node_id_counter += 1;
        let node_id = format!("b{}", self.node_id_counter);
        self.node_ids.insert(id, node_id.clone());
        node_id
    }
}

fn push_text(element: &mut Element, text: &str) {
    if !text.is_empty() {
        element.push_text(text);
    }
}
