//! RDF/XML processor: XML tree -> statements -> resources.
//!
//! Processing runs in three phases:
//!
//! 1. [`RdfXmlProcessor::set_rdf`] walks the tree and records statements.
//!    Terms whose final kind is not yet known are proxies (an IRI or a node
//!    ID); typed node elements become real resources right away so their
//!    factory sees the type.
//! 2. [`RdfXmlProcessor::create_resources`] turns every proxy into a
//!    resource, preferring the type found in `(proxy, rdf:type, X)`
//!    statements, and rewrites the statements without proxies.
//! 3. [`RdfXmlProcessor::process_statements`] attaches the statements as
//!    property values.
//!
//! [`RdfXmlProcessor::process`] runs all three.

use oxiri::Iri;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::codec::iri::{self, is_ncname, split_iri};
use crate::error::ProcessError;
use crate::model::{
    member_property_uri, Graph, Literal, Object, PlainLiteral, ProxyId, ProxyKey, ResourceId,
    ResourceKind, Statement, Term, TypedLiteral, Value, XmlLiteral,
};
use crate::vocab::{
    is_property_attribute, is_reserved_attribute, rdf, FORBIDDEN_NODE_NAMES,
    FORBIDDEN_PROPERTY_NAMES, RDF_NS, XML_NS,
};
use crate::xml::{Document, Element, QName, XmlNode};

// =============================================================================
// Proxy table
// =============================================================================

/// Interned proxy keys.
#[derive(Debug, Default)]
struct ProxyTable {
    keys: Vec<ProxyKey>,
    index: FxHashMap<ProxyKey, ProxyId>,
}

impl ProxyTable {
    fn intern(&mut self, key: ProxyKey) -> ProxyId {
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = ProxyId(self.keys.len() as u32);
        self.keys.push(key.clone());
        self.index.insert(key, id);
        id
    }

    fn key(&self, id: ProxyId) -> Option<&ProxyKey> {
        self.keys.get(id.0 as usize)
    }

    fn clear(&mut self) {
        self.keys.clear();
        self.index.clear();
    }
}

/// Facts about proxies gathered from the statements, built on demand.
#[derive(Debug, Default)]
struct ProxyIndex {
    types: FxHashMap<ProxyId, Vec<Term>>,
    list_cells: FxHashSet<ProxyId>,
}

// =============================================================================
// Scope
// =============================================================================

/// Inherited `xml:base` and `xml:lang`.
#[derive(Debug, Clone, Default)]
struct Scope {
    base: Option<Iri<String>>,
    language: Option<String>,
}

impl Scope {
    fn enter(&self, element: &Element) -> Result<Scope, ProcessError> {
        let mut scope = self.clone();
        if let Some(base) = element.attribute(XML_NS, "base") {
            let resolved = iri::resolve(self.base.as_ref(), base)?;
            scope.base = Some(iri::parse_base(&resolved)?);
        }
        if let Some(language) = element.attribute(XML_NS, "lang") {
            scope.language = (!language.is_empty()).then(|| language.to_string());
        }
        Ok(scope)
    }

    fn resolve(&self, reference: &str) -> Result<String, ProcessError> {
        iri::resolve(self.base.as_ref(), reference)
    }

    fn plain(&self, lexical: impl Into<String>) -> Literal {
        Literal::Plain(PlainLiteral::new(lexical, self.language.as_deref()))
    }
}

/// How a node element names its resource.
enum Identity {
    Uri(String),
    NodeId(String),
    Anonymous,
}

/// Reserved attributes of a property element.
#[derive(Default)]
struct PropertyAttributes<'a> {
    id: Option<&'a str>,
    parse_type: Option<&'a str>,
    resource: Option<&'a str>,
    node_id: Option<&'a str>,
    datatype: Option<&'a str>,
    properties: Vec<(&'a QName, &'a str)>,
}

// =============================================================================
// Processor
// =============================================================================

/// Reads RDF/XML documents into a [`Graph`].
///
/// Node IDs and proxies are scoped to one document: [`process`] resets them
/// when it is done. The collected statements are kept until
/// [`clear_statements`] so callers can inspect them.
///
/// [`process`]: RdfXmlProcessor::process
/// [`clear_statements`]: RdfXmlProcessor::clear_statements
#[derive(Debug, Default)]
pub struct RdfXmlProcessor {
    statements: Vec<Statement>,
    /// Statements before this index were already attached to the graph.
    materialized: usize,
    proxies: ProxyTable,
    resolved: FxHashMap<ProxyId, ResourceId>,
    /// Proxies that occur in a statement or name a top-level node, in first-use order.
    mentioned: Vec<ProxyId>,
    mentioned_set: FxHashSet<ProxyId>,
    resolving: FxHashSet<ProxyId>,
    index: Option<ProxyIndex>,
    used_ids: FxHashSet<String>,
    blank_counter: u64,
}

impl RdfXmlProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a document into `graph` and returns its top-level resources in
    /// document order.
    ///
    /// On error the processor forgets this document's statements, but the
    /// graph is not rolled back: resources and properties attached before
    /// the failure stay in it.
    pub fn process(
        &mut self,
        graph: &mut Graph,
        document: &Document,
        base: Option<&str>,
    ) -> Result<Vec<ResourceId>, ProcessError> {
        let start = self.statements.len();
        let result = self.run(graph, document, base);
        if result.is_err() {
            // Proxies die with the reset, so this document's statements go too.
            self.statements.truncate(start);
            self.materialized = self.materialized.min(start);
        }
        self.reset();
        result
    }

    fn run(
        &mut self,
        graph: &mut Graph,
        document: &Document,
        base: Option<&str>,
    ) -> Result<Vec<ResourceId>, ProcessError> {
        let nodes = self.set_rdf(graph, &document.root, base)?;
        self.create_resources(graph)?;
        self.process_statements(graph)?;
        nodes
            .into_iter()
            .map(|term| self.resolve_term(term))
            .collect()
    }

    /// Statements collected so far.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Forgets proxies, node IDs and `rdf:ID`s. Statements are kept.
    pub fn reset(&mut self) {
        self.proxies.clear();
        self.resolved.clear();
        self.mentioned.clear();
        self.mentioned_set.clear();
        self.resolving.clear();
        self.index = None;
        self.used_ids.clear();
        self.blank_counter = 0;
    }

    /// Drops the collected statements.
    pub fn clear_statements(&mut self) {
        self.statements.clear();
        self.materialized = 0;
        self.index = None;
    }

    // =========================================================================
    // Phase 1: tree -> statements
    // =========================================================================

    /// Walks an `rdf:RDF` element (or a single node element used as the
    /// document root) and records its statements. Returns the top-level
    /// node terms.
    pub fn set_rdf(
        &mut self,
        graph: &mut Graph,
        root: &Element,
        base: Option<&str>,
    ) -> Result<Vec<Term>, ProcessError> {
        let scope = Scope {
            base: base.map(iri::parse_base).transpose()?,
            language: None,
        };
        let before = self.statements.len();

        let mut nodes = Vec::new();
        if root.name.is(RDF_NS, "RDF") {
            let scope = scope.enter(root)?;
            if let Some(attribute) = root
                .attributes
                .iter()
                .find(|a| !a.name.in_namespace(XML_NS))
            {
                return Err(illegal(&attribute.name, root, "rdf:RDF"));
            }
            for child in &root.children {
                match child {
                    XmlNode::Element(element) => nodes.push(self.node_element(graph, element, &scope)?),
                    XmlNode::Text(text) => expect_whitespace(root, text)?,
                    XmlNode::Comment(_) => {}
                }
            }
        } else {
            nodes.push(self.node_element(graph, root, &scope)?);
        }

        for term in &nodes {
            if let Term::Proxy(proxy) = term {
                self.mention(*proxy);
            }
        }
        debug!(
            nodes = nodes.len(),
            statements = self.statements.len() - before,
            "collected statements"
        );
        Ok(nodes)
    }

    fn node_element(
        &mut self,
        graph: &mut Graph,
        element: &Element,
        parent: &Scope,
    ) -> Result<Term, ProcessError> {
        let scope = parent.enter(element)?;
        let name = &element.name;
        let Some(namespace) = name.namespace.as_deref() else {
            return Err(ProcessError::UnqualifiedElement {
                element: name.to_string(),
            });
        };
        if namespace == RDF_NS && FORBIDDEN_NODE_NAMES.contains(name.local.as_str()) {
            return Err(ProcessError::ReservedElement {
                element: name.to_string(),
                context: "node",
            });
        }

        let mut identities = Vec::new();
        let mut properties = Vec::new();
        for attribute in &element.attributes {
            let attr = &attribute.name;
            match attr.namespace.as_deref() {
                None => {
                    return Err(ProcessError::UnqualifiedAttribute {
                        attribute: attr.to_string(),
                        element: name.to_string(),
                    });
                }
                Some(XML_NS) => {}
                Some(RDF_NS) => match attr.local.as_str() {
                    "about" | "ID" | "nodeID" => identities.push(attribute),
                    local if is_reserved_attribute(local) || !is_property_attribute(local) => {
                        return Err(illegal(attr, element, "node"));
                    }
                    _ => properties.push(attribute),
                },
                Some(_) => properties.push(attribute),
            }
        }
        if identities.len() > 1 {
            return Err(ProcessError::ConflictingIdentity {
                element: name.to_string(),
            });
        }

        let identity = match identities.first() {
            None => Identity::Anonymous,
            Some(attribute) => match attribute.name.local.as_str() {
                "about" => Identity::Uri(scope.resolve(&attribute.value)?),
                "ID" => Identity::Uri(self.anchor_id(&scope, &attribute.value)?),
                _ => Identity::NodeId(node_id(&attribute.value)?),
            },
        };

        let subject = if name.is(RDF_NS, "Description") {
            match identity {
                Identity::Uri(uri) => self.uri_term(uri),
                Identity::NodeId(id) => Term::Proxy(self.proxies.intern(ProxyKey::NodeId(id))),
                Identity::Anonymous => self.fresh_blank(),
            }
        } else {
            let local = name.local.as_str();
            let resource = match identity {
                Identity::Uri(uri) => graph.locate_typed_resource(&uri, namespace, local),
                Identity::NodeId(id) => {
                    let proxy = self.proxies.intern(ProxyKey::NodeId(id));
                    match self.resolved.get(&proxy) {
                        Some(resource) => *resource,
                        None => {
                            let resource = graph.create_typed_blank(namespace, local);
                            self.resolved.insert(proxy, resource);
                            resource
                        }
                    }
                }
                Identity::Anonymous => graph.create_typed_blank(namespace, local),
            };
            let subject = Term::Resource(resource);
            let rdf_type = self.uri_term(rdf::TYPE.to_string());
            let type_term = self.uri_term(format!("{namespace}{local}"));
            self.push(subject, rdf_type, Object::Term(type_term));
            subject
        };
        trace!(element = %name, "node element");

        for attribute in properties {
            self.property_attribute(subject, &attribute.name, &attribute.value, &scope)?;
        }

        let mut li_counter = 1;
        for child in &element.children {
            match child {
                XmlNode::Element(child) => {
                    self.property_element(graph, subject, child, &scope, &mut li_counter)?
                }
                XmlNode::Text(text) => expect_whitespace(element, text)?,
                XmlNode::Comment(_) => {}
            }
        }
        Ok(subject)
    }

    fn property_attribute(
        &mut self,
        subject: Term,
        name: &QName,
        value: &str,
        scope: &Scope,
    ) -> Result<(), ProcessError> {
        let Some(property) = name.to_iri() else {
            return Err(ProcessError::UnqualifiedAttribute {
                attribute: name.to_string(),
                element: String::new(),
            });
        };
        let object = if property == rdf::TYPE {
            Object::Term(self.uri_term(scope.resolve(value)?))
        } else {
            Object::Literal(scope.plain(value))
        };
        let predicate = self.uri_term(property);
        self.push(subject, predicate, object);
        Ok(())
    }

    fn property_element(
        &mut self,
        graph: &mut Graph,
        subject: Term,
        element: &Element,
        parent: &Scope,
        li_counter: &mut u32,
    ) -> Result<(), ProcessError> {
        let scope = parent.enter(element)?;
        let name = &element.name;
        let Some(property) = name.to_iri() else {
            return Err(ProcessError::UnqualifiedElement {
                element: name.to_string(),
            });
        };
        let property = if name.is(RDF_NS, "li") {
            let member = member_property_uri(*li_counter);
            *li_counter += 1;
            member
        } else if name.in_namespace(RDF_NS) && FORBIDDEN_PROPERTY_NAMES.contains(name.local.as_str()) {
            return Err(ProcessError::ReservedElement {
                element: name.to_string(),
                context: "property",
            });
        } else {
            property
        };
        let predicate = self.uri_term(property);
        let attrs = property_attributes(element)?;

        let reified = attrs
            .id
            .map(|id| self.anchor_id(&scope, id))
            .transpose()?;

        let object = if let Some(parse_type) = attrs.parse_type {
            self.parse_type_value(graph, element, &attrs, parse_type, &scope)?
        } else if attrs.resource.is_some()
            || (is_empty_content(element)
                && (attrs.node_id.is_some() || !attrs.properties.is_empty()))
        {
            self.reference_value(element, &attrs, &scope)?
        } else {
            self.content_value(graph, element, &attrs, &scope)?
        };

        self.push(subject, predicate, object.clone());
        if let Some(uri) = reified {
            self.reify(uri, subject, predicate, object);
        }
        Ok(())
    }

    /// `rdf:parseType` property elements.
    fn parse_type_value(
        &mut self,
        graph: &mut Graph,
        element: &Element,
        attrs: &PropertyAttributes<'_>,
        parse_type: &str,
        scope: &Scope,
    ) -> Result<Object, ProcessError> {
        let context = "parseType";
        for (present, local) in [
            (attrs.resource.is_some(), "resource"),
            (attrs.node_id.is_some(), "nodeID"),
            (attrs.datatype.is_some(), "datatype"),
        ] {
            if present {
                return Err(illegal(&rdf_qname(local), element, context));
            }
        }
        if let Some((name, _)) = attrs.properties.first() {
            return Err(illegal(name, element, context));
        }

        match parse_type {
            "Resource" => {
                if attrs.id.is_some() {
                    return Err(illegal(&rdf_qname("ID"), element, "parseType=\"Resource\""));
                }
                let node = self.fresh_blank();
                let mut li_counter = 1;
                for child in &element.children {
                    match child {
                        XmlNode::Element(child) => {
                            self.property_element(graph, node, child, scope, &mut li_counter)?
                        }
                        XmlNode::Text(text) => expect_whitespace(element, text)?,
                        XmlNode::Comment(_) => {}
                    }
                }
                Ok(Object::Term(node))
            }
            "Collection" => {
                let mut items = Vec::new();
                for child in &element.children {
                    match child {
                        XmlNode::Element(child) => items.push(self.node_element(graph, child, scope)?),
                        XmlNode::Text(text) => expect_whitespace(element, text)?,
                        XmlNode::Comment(_) => {}
                    }
                }
                let first = self.uri_term(rdf::FIRST.to_string());
                let rest = self.uri_term(rdf::REST.to_string());
                let mut tail = Term::Resource(graph.nil());
                for item in items.into_iter().rev() {
                    let cell = Term::Resource(graph.create_resource(None, ResourceKind::List));
                    self.push(cell, first, Object::Term(item));
                    self.push(cell, rest, Object::Term(tail));
                    tail = cell;
                }
                Ok(Object::Term(tail))
            }
            other => {
                if other != "Literal" {
                    warn!(parse_type = other, element = %element.name, "unknown rdf:parseType, reading as Literal");
                }
                let mut nodes = element.children.clone();
                for node in &mut nodes {
                    if let XmlNode::Element(child) = node {
                        child.declare_used_namespaces();
                    }
                }
                Ok(Object::Literal(Literal::Xml(XmlLiteral::new(nodes)?)))
            }
        }
    }

    /// `rdf:resource`, `rdf:nodeID` and attribute-only property elements.
    fn reference_value(
        &mut self,
        element: &Element,
        attrs: &PropertyAttributes<'_>,
        scope: &Scope,
    ) -> Result<Object, ProcessError> {
        let context = if attrs.resource.is_some() {
            "reference"
        } else {
            "empty property"
        };
        if attrs.datatype.is_some() {
            return Err(illegal(&rdf_qname("datatype"), element, context));
        }
        if attrs.resource.is_some() && attrs.node_id.is_some() {
            return Err(illegal(&rdf_qname("nodeID"), element, context));
        }
        if !is_empty_content(element) {
            return Err(illegal(&rdf_qname("resource"), element, "non-empty property"));
        }

        let value = if let Some(resource) = attrs.resource {
            self.uri_term(scope.resolve(resource)?)
        } else if let Some(id) = attrs.node_id {
            Term::Proxy(self.proxies.intern(ProxyKey::NodeId(node_id(id)?)))
        } else {
            self.fresh_blank()
        };
        for (name, text) in &attrs.properties {
            self.property_attribute(value, name, text, scope)?;
        }
        Ok(Object::Term(value))
    }

    /// Literal or nested node element content.
    fn content_value(
        &mut self,
        graph: &mut Graph,
        element: &Element,
        attrs: &PropertyAttributes<'_>,
        scope: &Scope,
    ) -> Result<Object, ProcessError> {
        if attrs.node_id.is_some() {
            return Err(illegal(&rdf_qname("nodeID"), element, "non-empty property"));
        }
        if let Some((name, _)) = attrs.properties.first() {
            return Err(illegal(name, element, "non-empty property"));
        }

        let children: Vec<&Element> = element.child_elements().collect();
        match children.as_slice() {
            // `<ex:p/>` names an empty blank node; any other attribute keeps it a literal.
            [] if element.children.is_empty()
                && element.attributes.iter().all(|a| a.name.is(RDF_NS, "ID")) =>
            {
                Ok(Object::Term(self.fresh_blank()))
            }
            [] => {
                let text = element.text();
                Ok(Object::Literal(match attrs.datatype {
                    Some(datatype) => {
                        Literal::Typed(TypedLiteral::new(text, scope.resolve(datatype)?))
                    }
                    None => scope.plain(text),
                }))
            }
            [child] => {
                if attrs.datatype.is_some() {
                    return Err(illegal(&rdf_qname("datatype"), element, "non-empty property"));
                }
                expect_whitespace(element, &element.text())?;
                Ok(Object::Term(self.node_element(graph, child, scope)?))
            }
            _ => Err(ProcessError::MultipleNodeElements {
                element: element.name.to_string(),
            }),
        }
    }

    fn reify(&mut self, uri: String, subject: Term, predicate: Term, object: Object) {
        let statement = self.uri_term(uri);
        let rdf_type = self.uri_term(rdf::TYPE.to_string());
        let statement_type = self.uri_term(rdf::STATEMENT.to_string());
        let subject_property = self.uri_term(rdf::SUBJECT.to_string());
        let predicate_property = self.uri_term(rdf::PREDICATE.to_string());
        let object_property = self.uri_term(rdf::OBJECT.to_string());
        self.push(statement, rdf_type, Object::Term(statement_type));
        self.push(statement, subject_property, Object::Term(subject));
        self.push(statement, predicate_property, Object::Term(predicate));
        self.push(statement, object_property, object);
    }

    fn anchor_id(&mut self, scope: &Scope, id: &str) -> Result<String, ProcessError> {
        if !is_ncname(id) {
            return Err(ProcessError::InvalidNodeId { id: id.to_string() });
        }
        let uri = iri::anchor(scope.base.as_ref(), id)?;
        if !self.used_ids.insert(uri.clone()) {
            return Err(ProcessError::DuplicateId { iri: uri });
        }
        Ok(uri)
    }

    fn uri_term(&mut self, uri: String) -> Term {
        Term::Proxy(self.proxies.intern(ProxyKey::Uri(uri)))
    }

    fn fresh_blank(&mut self) -> Term {
        self.blank_counter += 1;
        let key = ProxyKey::NodeId(format!("genid:{}", self.blank_counter));
        Term::Proxy(self.proxies.intern(key))
    }

    fn push(&mut self, subject: Term, predicate: Term, object: Object) {
        for term in [Some(subject), Some(predicate), object.as_term()]
            .into_iter()
            .flatten()
        {
            if let Term::Proxy(proxy) = term {
                self.mention(proxy);
            }
        }
        self.statements
            .push(Statement::new(subject, predicate, object));
        self.index = None;
    }

    fn mention(&mut self, proxy: ProxyId) {
        if self.mentioned_set.insert(proxy) {
            self.mentioned.push(proxy);
        }
    }

    // =========================================================================
    // Phase 2: proxies -> resources
    // =========================================================================

    /// Resolves every proxy and rewrites the statements without proxies.
    pub fn create_resources(&mut self, graph: &mut Graph) -> Result<(), ProcessError> {
        let proxies = self.mentioned.clone();
        for proxy in &proxies {
            self.unproxy(graph, *proxy)?;
        }

        let rewritten = self
            .statements
            .iter()
            .map(|statement| {
                Ok(Statement::new(
                    Term::Resource(self.resolve_term(statement.subject)?),
                    Term::Resource(self.resolve_term(statement.predicate)?),
                    match &statement.object {
                        Object::Term(term) => Object::Term(Term::Resource(self.resolve_term(*term)?)),
                        literal => literal.clone(),
                    },
                ))
            })
            .collect::<Result<Vec<_>, ProcessError>>()?;
        self.statements = rewritten;
        debug!(proxies = proxies.len(), resources = graph.len(), "resolved proxies");
        Ok(())
    }

    /// Returns the resource a proxy stands for, creating it on first use.
    /// Repeated calls return the same resource.
    pub fn unproxy(&mut self, graph: &mut Graph, proxy: ProxyId) -> Result<ResourceId, ProcessError> {
        if let Some(resource) = self.resolved.get(&proxy) {
            return Ok(*resource);
        }
        let key = match self.proxies.key(proxy) {
            Some(key) if self.mentioned_set.contains(&proxy) => key.clone(),
            Some(key) => return Err(ProcessError::UnknownProxy(key.to_string())),
            None => return Err(ProcessError::UnknownProxy(format!("#{}", proxy.0))),
        };

        let type_uri = if self.resolving.insert(proxy) {
            let type_uri = self.type_of(graph, proxy);
            self.resolving.remove(&proxy);
            let type_uri = type_uri?;
            // A type cycle may have resolved this proxy already.
            if let Some(resource) = self.resolved.get(&proxy) {
                return Ok(*resource);
            }
            type_uri
        } else {
            None
        };

        let is_list_cell = self.proxy_index(graph).list_cells.contains(&proxy);
        let typed = type_uri.as_deref().and_then(split_iri);
        let resource = match (&key, typed) {
            (ProxyKey::Uri(uri), Some((namespace, local))) => {
                graph.locate_typed_resource(uri, namespace, local)
            }
            (ProxyKey::Uri(uri), None) if is_list_cell => {
                graph.create_resource(Some(uri.as_str()), ResourceKind::List)
            }
            (ProxyKey::Uri(uri), None) => graph.locate_resource(uri),
            (ProxyKey::NodeId(_), Some((namespace, local))) => {
                graph.create_typed_blank(namespace, local)
            }
            (ProxyKey::NodeId(_), None) if is_list_cell => {
                graph.create_resource(None, ResourceKind::List)
            }
            (ProxyKey::NodeId(_), None) => graph.create_blank(),
        };
        trace!(proxy = %key, resource = %graph.describe(resource), "unproxied");
        self.resolved.insert(proxy, resource);
        Ok(resource)
    }

    /// The type IRI to build a proxy with: the first `rdf:type` whose
    /// namespace has a factory, else the first `rdf:type` with an IRI.
    fn type_of(&mut self, graph: &mut Graph, proxy: ProxyId) -> Result<Option<String>, ProcessError> {
        let candidates = self
            .proxy_index(graph)
            .types
            .get(&proxy)
            .cloned()
            .unwrap_or_default();

        let mut first = None;
        for term in candidates {
            let resource = match term {
                Term::Resource(resource) => resource,
                Term::Proxy(type_proxy) => self.unproxy(graph, type_proxy)?,
            };
            let Some(uri) = graph.uri(resource) else {
                continue;
            };
            if split_iri(uri).is_some_and(|(namespace, _)| graph.has_factory(namespace)) {
                return Ok(Some(uri.to_string()));
            }
            if first.is_none() {
                first = Some(uri.to_string());
            }
        }
        Ok(first)
    }

    fn proxy_index(&mut self, graph: &Graph) -> &ProxyIndex {
        let index = match self.index.take() {
            Some(index) => index,
            None => self.build_index(graph),
        };
        self.index.insert(index)
    }

    fn build_index(&self, graph: &Graph) -> ProxyIndex {
        let mut index = ProxyIndex::default();
        for statement in &self.statements {
            let Term::Proxy(subject) = statement.subject else {
                continue;
            };
            match self.term_uri(graph, statement.predicate) {
                Some(rdf::TYPE) => {
                    if let Some(term) = statement.object.as_term() {
                        index.types.entry(subject).or_default().push(term);
                    }
                }
                Some(rdf::FIRST) | Some(rdf::REST) => {
                    index.list_cells.insert(subject);
                }
                _ => {}
            }
        }
        index
    }

    fn term_uri<'a>(&'a self, graph: &'a Graph, term: Term) -> Option<&'a str> {
        match term {
            Term::Resource(resource) => graph.uri(resource),
            Term::Proxy(proxy) => match self.proxies.key(proxy) {
                Some(ProxyKey::Uri(uri)) => Some(uri.as_str()),
                _ => None,
            },
        }
    }

    fn resolve_term(&self, term: Term) -> Result<ResourceId, ProcessError> {
        match term {
            Term::Resource(resource) => Ok(resource),
            Term::Proxy(proxy) => self.resolved.get(&proxy).copied().ok_or_else(|| {
                ProcessError::UnknownProxy(
                    self.proxies
                        .key(proxy)
                        .map(ToString::to_string)
                        .unwrap_or_else(|| format!("#{}", proxy.0)),
                )
            }),
        }
    }

    // =========================================================================
    // Phase 3: statements -> properties
    // =========================================================================

    /// Attaches every resolved statement not yet attached to the graph.
    /// Statements that still hold proxies are skipped.
    pub fn process_statements(&mut self, graph: &mut Graph) -> Result<(), ProcessError> {
        let mut added = 0usize;
        for statement in &self.statements[self.materialized..] {
            let (Term::Resource(subject), Term::Resource(predicate)) =
                (statement.subject, statement.predicate)
            else {
                continue;
            };
            let value = match &statement.object {
                Object::Literal(literal) => Value::Literal(literal.clone()),
                Object::Term(Term::Resource(resource)) => Value::Resource(*resource),
                Object::Term(Term::Proxy(_)) => continue,
            };
            if graph.add_property(subject, predicate, value)? {
                added += 1;
            }
        }
        self.materialized = self.statements.len();
        debug!(added, "attached statements");
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn property_attributes(element: &Element) -> Result<PropertyAttributes<'_>, ProcessError> {
    let mut attrs = PropertyAttributes::default();
    for attribute in &element.attributes {
        let name = &attribute.name;
        let value = attribute.value.as_str();
        match name.namespace.as_deref() {
            None => {
                return Err(ProcessError::UnqualifiedAttribute {
                    attribute: name.to_string(),
                    element: element.name.to_string(),
                });
            }
            Some(XML_NS) => {}
            Some(RDF_NS) if is_reserved_attribute(&name.local) => match name.local.as_str() {
                "ID" => attrs.id = Some(value),
                "parseType" => attrs.parse_type = Some(value),
                "resource" => attrs.resource = Some(value),
                "nodeID" => attrs.node_id = Some(value),
                "datatype" => attrs.datatype = Some(value),
                _ => return Err(illegal(name, element, "property")),
            },
            Some(RDF_NS) if !is_property_attribute(&name.local) => {
                return Err(illegal(name, element, "property"));
            }
            Some(_) => attrs.properties.push((name, value)),
        }
    }
    Ok(attrs)
}

fn node_id(id: &str) -> Result<String, ProcessError> {
    if is_ncname(id) {
        Ok(id.to_string())
    } else {
        Err(ProcessError::InvalidNodeId { id: id.to_string() })
    }
}

fn is_empty_content(element: &Element) -> bool {
    element.child_elements().next().is_none() && element.text().trim().is_empty()
}

fn expect_whitespace(element: &Element, text: &str) -> Result<(), ProcessError> {
    if text.trim().is_empty() {
        Ok(())
    } else {
        Err(ProcessError::UnexpectedText {
            element: element.name.to_string(),
            text: text.trim().to_string(),
        })
    }
}

fn rdf_qname(local: &str) -> QName {
    QName::qualified("rdf", RDF_NS, local)
}

fn illegal(attribute: &QName, element: &Element, context: &'static str) -> ProcessError {
    ProcessError::IllegalAttribute {
        attribute: attribute.to_string(),
        element: element.name.to_string(),
        context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ModelError};
    use crate::model::{ListResource, RdfContainer, SeqResource};

    const EX: &str = "http://example.org/";

    fn parse(input: &str) -> Result<(Graph, Vec<ResourceId>), ProcessError> {
        parse_with_base(input, None)
    }

    fn parse_with_base(
        input: &str,
        base: Option<&str>,
    ) -> Result<(Graph, Vec<ResourceId>), ProcessError> {
        let document = Document::parse_str(input)?;
        let mut graph = Graph::new();
        let roots = RdfXmlProcessor::new().process(&mut graph, &document, base)?;
        Ok((graph, roots))
    }

    fn rdf(body: &str) -> String {
        format!(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://example.org/">{body}</rdf:RDF>"#
        )
    }

    fn literal<'g>(graph: &'g Graph, id: ResourceId, property: &str) -> Option<&'g Literal> {
        graph.first_value(id, property).and_then(Value::as_literal)
    }

    #[test]
    fn test_typed_node_with_literal_property() {
        let (graph, roots) = parse(&rdf(
            r#"<ex:Person rdf:about="http://x/1"><ex:name>Ann</ex:name></ex:Person>"#,
        ))
        .unwrap();

        assert_eq!(roots.len(), 1);
        let ann = roots[0];
        assert_eq!(graph.uri(ann), Some("http://x/1"));
        assert!(graph.has_type(ann, "http://example.org/Person"));
        assert_eq!(graph.types(ann).len(), 1);
        let names = graph.values(ann, "http://example.org/name");
        assert_eq!(names, vec![&Value::Literal(Literal::plain("Ann"))]);
        assert_eq!(graph.properties(ann).len(), 2);
    }

    #[test]
    fn test_about_and_id_conflict() {
        let err = parse(&rdf(r#"<rdf:Description rdf:about="http://x/1" rdf:ID="a"/>"#)).unwrap_err();
        assert!(matches!(err, ProcessError::ConflictingIdentity { .. }));
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_about_on_reference_is_rejected() {
        let err = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:knows rdf:resource="http://x/2" rdf:about="http://x/3"/></rdf:Description>"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ProcessError::IllegalAttribute { .. }));
    }

    #[test]
    fn test_unqualified_attribute_is_rejected() {
        let err = parse(&rdf(r#"<rdf:Description about="http://x/1"/>"#)).unwrap_err();
        assert!(matches!(err, ProcessError::UnqualifiedAttribute { .. }));
    }

    #[test]
    fn test_property_attributes_and_rdf_type_attribute() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1" ex:name="Ann" rdf:type="http://example.org/Person"/>"#,
        ))
        .unwrap();
        let ann = roots[0];
        assert_eq!(literal(&graph, ann, "http://example.org/name"), Some(&Literal::plain("Ann")));
        assert!(graph.has_type(ann, "http://example.org/Person"));
    }

    #[test]
    fn test_li_numbering_follows_document_order() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Seq rdf:about="http://x/s"><rdf:li>a</rdf:li><rdf:li>b</rdf:li><rdf:li>c</rdf:li></rdf:Seq>"#,
        ))
        .unwrap();
        let seq = SeqResource::from_resource(&graph, roots[0]).unwrap();
        let items: Vec<_> = seq
            .item_list(&graph)
            .iter()
            .map(|v| v.as_literal().unwrap().lexical_form().to_string())
            .collect();
        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(seq.item(&graph, 3), Some(&Value::Literal(Literal::plain("c"))));
    }

    #[test]
    fn test_description_typed_as_seq_uses_factory() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/s"><rdf:type rdf:resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#Seq"/><rdf:_2>b</rdf:_2><rdf:_1>a</rdf:_1></rdf:Description>"#,
        ))
        .unwrap();
        assert_eq!(graph.kind(roots[0]), ResourceKind::Seq);
        let seq = SeqResource::from_resource(&graph, roots[0]).unwrap();
        assert_eq!(seq.item_list(&graph)[0], Value::Literal(Literal::plain("a")));
    }

    #[test]
    fn test_parse_type_collection() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:items rdf:parseType="Collection"><rdf:Description rdf:about="http://x/a"/><rdf:Description rdf:about="http://x/b"/></ex:items><ex:none rdf:parseType="Collection"/></rdf:Description>"#,
        ))
        .unwrap();
        let subject = roots[0];
        let head = graph
            .first_value(subject, "http://example.org/items")
            .and_then(Value::as_resource)
            .unwrap();
        let list = ListResource::from_resource(&graph, head).unwrap();
        assert_eq!(list.size(&graph), 2);
        let a = graph.get("http://x/a").unwrap();
        assert_eq!(list.get(&graph, 0).unwrap(), &Value::Resource(a));

        let none = graph.first_value(subject, "http://example.org/none");
        assert_eq!(none, Some(&Value::Resource(graph.nil())));
    }

    #[test]
    fn test_parse_type_resource() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:address rdf:parseType="Resource"><ex:city>Oslo</ex:city></ex:address></rdf:Description>"#,
        ))
        .unwrap();
        let address = graph
            .first_value(roots[0], "http://example.org/address")
            .and_then(Value::as_resource)
            .unwrap();
        assert!(graph.is_blank(address));
        assert_eq!(literal(&graph, address, "http://example.org/city"), Some(&Literal::plain("Oslo")));
    }

    #[test]
    fn test_parse_type_resource_forbids_resource_attribute() {
        let err = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:p rdf:parseType="Resource" rdf:resource="http://x/2"/></rdf:Description>"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ProcessError::IllegalAttribute { context: "parseType", .. }));
    }

    #[test]
    fn test_parse_type_literal_is_self_contained() {
        let (graph, roots) = parse(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://example.org/" xmlns:h="http://www.w3.org/1999/xhtml">
<rdf:Description rdf:about="http://x/1"><ex:body rdf:parseType="Literal"><h:p>Hello <h:b>world</h:b></h:p></ex:body></rdf:Description></rdf:RDF>"#,
        )
        .unwrap();
        let body = literal(&graph, roots[0], "http://example.org/body").unwrap();
        assert_eq!(body.datatype(), Some(rdf::XML_LITERAL));
        assert_eq!(
            body.lexical_form(),
            r#"<h:p xmlns:h="http://www.w3.org/1999/xhtml">Hello <h:b>world</h:b></h:p>"#
        );
    }

    #[test]
    fn test_language_datatype_and_empty_literals() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1" xml:lang="en"><ex:title>Hi</ex:title><ex:titre xml:lang="fr">Salut</ex:titre><ex:plain xml:lang="">x</ex:plain><ex:age rdf:datatype="http://www.w3.org/2001/XMLSchema#integer">42</ex:age><ex:empty/></rdf:Description>"#,
        ))
        .unwrap();
        let s = roots[0];
        assert_eq!(literal(&graph, s, "http://example.org/title").unwrap().language(), Some("en"));
        assert_eq!(literal(&graph, s, "http://example.org/titre").unwrap().language(), Some("fr"));
        assert_eq!(literal(&graph, s, "http://example.org/plain").unwrap().language(), None);
        assert_eq!(
            literal(&graph, s, "http://example.org/age"),
            Some(&Literal::from(TypedLiteral::integer(42)))
        );
        let empty = graph
            .first_value(s, "http://example.org/empty")
            .and_then(Value::as_resource)
            .unwrap();
        assert!(graph.is_blank(empty));
        assert!(graph.properties(empty).is_empty());
    }

    #[test]
    fn test_empty_content_with_attributes_stays_literal() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:a xml:lang="en"/><ex:b xml:lang=""></ex:b><ex:c rdf:datatype="http://www.w3.org/2001/XMLSchema#string"/><ex:d> </ex:d></rdf:Description>"#,
        ))
        .unwrap();
        let s = roots[0];
        assert_eq!(
            literal(&graph, s, "http://example.org/a"),
            Some(&Literal::with_language("", "en"))
        );
        assert_eq!(literal(&graph, s, "http://example.org/b"), Some(&Literal::plain("")));
        assert_eq!(
            literal(&graph, s, "http://example.org/c").map(Literal::lexical_form),
            Some("")
        );
        assert_eq!(literal(&graph, s, "http://example.org/d"), Some(&Literal::plain(" ")));
    }

    #[test]
    fn test_node_ids_share_a_resource() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:knows rdf:nodeID="b"/></rdf:Description>
<rdf:Description rdf:about="http://x/2"><ex:knows rdf:nodeID="b"/></rdf:Description>
<rdf:Description rdf:nodeID="b" ex:name="Bob"/>"#,
        ))
        .unwrap();
        let first = graph.first_value(roots[0], "http://example.org/knows");
        let second = graph.first_value(roots[1], "http://example.org/knows");
        assert_eq!(first, second);
        assert_eq!(first, Some(&Value::Resource(roots[2])));
        assert_eq!(literal(&graph, roots[2], "http://example.org/name"), Some(&Literal::plain("Bob")));
    }

    #[test]
    fn test_typed_node_with_node_id_is_shared() {
        let (graph, roots) = parse(&rdf(
            r#"<ex:Person rdf:nodeID="p" ex:name="Ann"/><rdf:Description rdf:about="http://x/1"><ex:knows rdf:nodeID="p"/></rdf:Description>"#,
        ))
        .unwrap();
        let known = graph.first_value(roots[1], "http://example.org/knows");
        assert_eq!(known, Some(&Value::Resource(roots[0])));
        assert!(graph.has_type(roots[0], "http://example.org/Person"));
    }

    #[test]
    fn test_empty_property_with_attributes_is_blank_node() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:address ex:city="Oslo"/></rdf:Description>"#,
        ))
        .unwrap();
        let address = graph
            .first_value(roots[0], "http://example.org/address")
            .and_then(Value::as_resource)
            .unwrap();
        assert!(graph.is_blank(address));
        assert_eq!(literal(&graph, address, "http://example.org/city"), Some(&Literal::plain("Oslo")));
    }

    #[test]
    fn test_base_and_id_resolution() {
        let (graph, roots) = parse_with_base(
            &rdf(
                r#"<rdf:Description rdf:ID="me"><ex:page rdf:resource="page.html"/></rdf:Description><rdf:Description xml:base="http://other.org/dir/" rdf:about="x"/>"#,
            ),
            Some("http://example.org/doc"),
        )
        .unwrap();
        assert_eq!(graph.uri(roots[0]), Some("http://example.org/doc#me"));
        let page = graph
            .first_value(roots[0], "http://example.org/page")
            .and_then(Value::as_resource)
            .unwrap();
        assert_eq!(graph.uri(page), Some("http://example.org/page.html"));
        assert_eq!(graph.uri(roots[1]), Some("http://other.org/dir/x"));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = parse_with_base(
            &rdf(r#"<rdf:Description rdf:ID="a"/><rdf:Description rdf:ID="a"/>"#),
            Some("http://example.org/doc"),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::DuplicateId { .. }));
    }

    #[test]
    fn test_relative_reference_without_base_is_syntax_error() {
        let err = parse(&rdf(r#"<rdf:Description rdf:about="relative"/>"#)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_property_id_reifies() {
        let (graph, _) = parse_with_base(
            &rdf(r#"<rdf:Description rdf:about="http://x/1"><ex:name rdf:ID="st">Ann</ex:name></rdf:Description>"#),
            Some("http://example.org/doc"),
        )
        .unwrap();
        let statement = graph.get("http://example.org/doc#st").unwrap();
        assert!(graph.has_type(statement, rdf::STATEMENT));
        assert_eq!(literal(&graph, statement, rdf::OBJECT), Some(&Literal::plain("Ann")));
    }

    #[test]
    fn test_structure_errors() {
        let cases = [
            r#"<rdf:Description rdf:about="http://x/1">text</rdf:Description>"#,
            r#"<rdf:Description rdf:about="http://x/1"><ex:p><rdf:Description/><rdf:Description/></ex:p></rdf:Description>"#,
            r#"<rdf:Description rdf:nodeID="1bad"/>"#,
            r#"<rdf:li/>"#,
            r#"<rdf:Description rdf:about="http://x/1"><rdf:Description/></rdf:Description>"#,
        ];
        for case in cases {
            let err = parse(&rdf(case)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Structure, "{case}: {err}");
        }
    }

    #[test]
    fn test_untyped_first_rest_chain_becomes_list() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:nodeID="l1"><rdf:first>a</rdf:first><rdf:rest rdf:resource="http://www.w3.org/1999/02/22-rdf-syntax-ns#nil"/></rdf:Description>"#,
        ))
        .unwrap();
        assert_eq!(graph.kind(roots[0]), ResourceKind::List);
        let list = ListResource::from_resource(&graph, roots[0]).unwrap();
        assert_eq!(list.size(&graph), 1);
    }

    #[test]
    fn test_single_node_root() {
        let (graph, roots) = parse(
            r#"<ex:Person xmlns:ex="http://example.org/" xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" rdf:about="http://x/1"/>"#,
        )
        .unwrap();
        assert!(graph.has_type(roots[0], "http://example.org/Person"));
    }

    #[test]
    fn test_unproxy_is_idempotent_and_rejects_unknown() {
        let document = Document::parse_str(&rdf(
            r#"<rdf:Description rdf:about="http://x/1"><ex:knows rdf:nodeID="b"/></rdf:Description>"#,
        ))
        .unwrap();
        let mut graph = Graph::new();
        let mut processor = RdfXmlProcessor::new();
        processor.set_rdf(&mut graph, &document.root, None).unwrap();

        let object = processor.statements()[0].object.as_term().unwrap();
        let proxy = object.as_proxy().unwrap();
        let first = processor.unproxy(&mut graph, proxy).unwrap();
        let second = processor.unproxy(&mut graph, proxy).unwrap();
        assert_eq!(first, second);

        let stray = processor.proxies.intern(ProxyKey::Uri(format!("{EX}stray")));
        assert!(matches!(
            processor.unproxy(&mut graph, stray),
            Err(ProcessError::UnknownProxy(_))
        ));
    }

    #[test]
    fn test_failure_while_attaching_keeps_earlier_properties() {
        let broken = Document::parse_str(&rdf(
            r#"<rdf:Description rdf:about="http://x/1" ex:name="Ann"/>
<rdf:Seq rdf:about="http://x/s"><rdf:_1>a</rdf:_1><rdf:_0>b</rdf:_0></rdf:Seq>"#,
        ))
        .unwrap();
        let mut graph = Graph::new();
        let mut processor = RdfXmlProcessor::new();

        let err = processor.process(&mut graph, &broken, None).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Model(ModelError::MalformedMemberProperty { .. })
        ));
        let ann = graph.get("http://x/1").unwrap();
        assert_eq!(literal(&graph, ann, "http://example.org/name"), Some(&Literal::plain("Ann")));
        let seq = graph.get("http://x/s").unwrap();
        let seq = SeqResource::from_resource(&graph, seq).unwrap();
        assert_eq!(seq.len(&graph), 1);
        assert!(processor.statements().is_empty());

        // The processor stays usable for the next document.
        let next = Document::parse_str(&rdf(r#"<rdf:Description rdf:about="http://x/2" ex:name="Bob"/>"#))
            .unwrap();
        let roots = processor.process(&mut graph, &next, None).unwrap();
        assert_eq!(literal(&graph, roots[0], "http://example.org/name"), Some(&Literal::plain("Bob")));
    }

    #[test]
    fn test_rdf_attribute_names_on_node_elements() {
        let (graph, roots) = parse(&rdf(
            r#"<rdf:Description rdf:about="http://x/1" rdf:_1="first" rdf:value="v"/>"#,
        ))
        .unwrap();
        assert_eq!(
            literal(&graph, roots[0], &member_property_uri(1)),
            Some(&Literal::plain("first"))
        );
        assert_eq!(literal(&graph, roots[0], rdf::VALUE), Some(&Literal::plain("v")));

        for attribute in ["li", "bagID", "resource", "Description"] {
            let err = parse(&rdf(&format!(
                r#"<rdf:Description rdf:about="http://x/1" rdf:{attribute}="x"/>"#
            )))
            .unwrap_err();
            assert!(matches!(err, ProcessError::IllegalAttribute { .. }), "{attribute}: {err}");
        }
    }

    #[test]
    fn test_phases_and_statement_lifecycle() {
        let document = Document::parse_str(&rdf(
            r#"<ex:Person rdf:about="http://x/1" ex:name="Ann"/>"#,
        ))
        .unwrap();
        let mut graph = Graph::new();
        let mut processor = RdfXmlProcessor::new();

        processor.set_rdf(&mut graph, &document.root, None).unwrap();
        assert!(processor.statements().iter().any(|s| !s.is_resolved()));
        processor.create_resources(&mut graph).unwrap();
        assert!(processor.statements().iter().all(Statement::is_resolved));
        processor.process_statements(&mut graph).unwrap();

        let ann = graph.get("http://x/1").unwrap();
        assert_eq!(literal(&graph, ann, "http://example.org/name"), Some(&Literal::plain("Ann")));
        assert_eq!(processor.statements().len(), 2);
        processor.clear_statements();
        assert!(processor.statements().is_empty());
    }
}
