//! Namespace prefixes used when writing RDF/XML.

use rustc_hash::FxHashMap;

use crate::codec::iri::split_iri;
use crate::vocab::{RDFS_NS, RDF_NS, XSD_NS};

/// Bidirectional prefix <-> namespace map.
///
/// Unknown namespaces get generated prefixes `ns1`, `ns2`, ... in the order
/// they are first assigned, so output is deterministic.
#[derive(Debug, Clone)]
pub struct PrefixMap {
    by_prefix: FxHashMap<String, String>,
    by_namespace: FxHashMap<String, String>,
    generated: usize,
}

impl Default for PrefixMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixMap {
    /// Creates a map with the common RDF prefixes.
    pub fn new() -> Self {
        let mut map = Self::empty();
        map.insert("rdf", RDF_NS);
        map.insert("rdfs", RDFS_NS);
        map.insert("xsd", XSD_NS);
        map.insert("owl", "http://www.w3.org/2002/07/owl#");
        map.insert("foaf", "http://xmlns.com/foaf/0.1/");
        map.insert("dc", "http://purl.org/dc/elements/1.1/");
        map.insert("dcterms", "http://purl.org/dc/terms/");
        map
    }

    /// Creates a map without any prefix.
    pub fn empty() -> Self {
        Self {
            by_prefix: FxHashMap::default(),
            by_namespace: FxHashMap::default(),
            generated: 0,
        }
    }

    /// Binds `prefix` to `namespace`, replacing an earlier binding of either.
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let prefix = prefix.into();
        let namespace = namespace.into();
        if let Some(old) = self.by_prefix.remove(&prefix) {
            self.by_namespace.remove(&old);
        }
        if let Some(old) = self.by_namespace.remove(&namespace) {
            self.by_prefix.remove(&old);
        }
        self.by_namespace.insert(namespace.clone(), prefix.clone());
        self.by_prefix.insert(prefix, namespace);
    }

    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.by_namespace.get(namespace).map(String::as_str)
    }

    pub fn namespace_for(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }

    /// Expands `prefix:local`.
    pub fn expand(&self, compact: &str) -> Option<String> {
        let (prefix, local) = compact.split_once(':')?;
        self.namespace_for(prefix).map(|ns| format!("{ns}{local}"))
    }

    /// Writes an IRI as `prefix:local` when its namespace has a prefix.
    pub fn compact(&self, iri: &str) -> Option<String> {
        let (namespace, local) = split_iri(iri)?;
        self.prefix_for(namespace)
            .map(|prefix| format!("{prefix}:{local}"))
    }

    /// Returns the prefix for `namespace`, generating one if needed.
    pub fn assign(&mut self, namespace: &str) -> String {
        if let Some(prefix) = self.prefix_for(namespace) {
            return prefix.to_string();
        }
        let prefix = loop {
            self.generated += 1;
            let candidate = format!("ns{}", self.generated);
            if !self.by_prefix.contains_key(&candidate) {
                break candidate;
            }
        };
        self.insert(prefix.clone(), namespace);
        prefix
    }

    /// All bindings, sorted by prefix.
    pub fn iter(&self) -> Vec<(&str, &str)> {
        let mut bindings: Vec<_> = self
            .by_prefix
            .iter()
            .map(|(p, ns)| (p.as_str(), ns.as_str()))
            .collect();
        bindings.sort();
        bindings
    }
}
