//! Per-context namespace prefix table
//!
//! Every derived context receives its own copy, so a registration on one
//! context never becomes visible from its parent or its siblings.

use std::collections::BTreeMap;

use crate::index::{Document, NodeId};

/// Prefix to URI bindings; last registration wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceRegistry {
    bindings: BTreeMap<String, String>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `xmlns:prefix` declarations on the root element
    pub fn from_document_root(doc: &Document) -> Self {
        let mut registry = Self::new();
        for (prefix, uri) in doc.namespace_declarations(NodeId::Element(doc.root())) {
            registry.register(prefix, uri);
        }
        registry
    }

    pub fn register(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Copy every binding of `other` into this registry, overwriting
    pub fn extend_from(&mut self, other: &NamespaceRegistry) {
        self.bindings.extend(
            other
                .bindings
                .iter()
                .map(|(prefix, uri)| (prefix.clone(), uri.clone())),
        );
    }

    /// Declarations to compile a query against, sorted by prefix
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .map(|(prefix, uri)| (prefix.clone(), uri.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
