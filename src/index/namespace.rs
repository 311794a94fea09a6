//! Namespace Resolution
//!
//! Stack-based resolver used while building the index. Bindings are pushed
//! as `xmlns` attributes are seen and dropped when their element closes, so
//! each element and attribute is resolved exactly once at parse time.

use super::element::NO_NAMESPACE;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

#[derive(Debug, Clone, Copy)]
struct NsBinding<'a> {
    /// "" for the default namespace
    prefix: &'a str,
    /// Interned URI id, NO_NAMESPACE for `xmlns=""`
    uri: u32,
    depth: u32,
}

#[derive(Debug)]
pub struct NamespaceScopes<'a> {
    bindings: Vec<NsBinding<'a>>,
    depth: u32,
}

impl<'a> NamespaceScopes<'a> {
    /// `xml_uri` is the interned id of the predefined `xml` namespace
    pub fn new(xml_uri: u32) -> Self {
        let mut bindings = Vec::with_capacity(16);
        bindings.push(NsBinding {
            prefix: "xml",
            uri: xml_uri,
            depth: 0,
        });
        Self { bindings, depth: 0 }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while self
            .bindings
            .last()
            .is_some_and(|binding| binding.depth >= self.depth && binding.depth > 0)
        {
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Bind `prefix` ("" for the default namespace) in the current scope
    pub fn declare(&mut self, prefix: &'a str, uri: u32) {
        self.bindings.push(NsBinding {
            prefix,
            uri,
            depth: self.depth,
        });
    }

    /// Resolve a prefix; `None` means the prefix is unbound.
    ///
    /// The default namespace always resolves, to NO_NAMESPACE when undeclared.
    pub fn resolve(&self, prefix: &str) -> Option<u32> {
        let found = self
            .bindings
            .iter()
            .rev()
            .find(|binding| binding.prefix == prefix)
            .map(|binding| binding.uri);
        match (found, prefix.is_empty()) {
            (Some(NO_NAMESPACE), false) => None,
            (None, true) => Some(NO_NAMESPACE),
            (found, _) => found,
        }
    }
}

/// Split a qualified name into (prefix, local); prefix is "" when absent
#[inline]
pub fn split_qname(qname: &str) -> (&str, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", qname),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_bindings() {
        let mut scopes = NamespaceScopes::new(0);
        scopes.push_scope();
        scopes.declare("a", 1);
        scopes.declare("", 2);
        assert_eq!(scopes.resolve("a"), Some(1));
        assert_eq!(scopes.resolve(""), Some(2));

        scopes.push_scope();
        scopes.declare("a", 3);
        assert_eq!(scopes.resolve("a"), Some(3));
        scopes.pop_scope();

        assert_eq!(scopes.resolve("a"), Some(1));
        scopes.pop_scope();
        assert_eq!(scopes.resolve("a"), None);
        assert_eq!(scopes.resolve(""), Some(NO_NAMESPACE));
    }

    #[test]
    fn test_xml_prefix_predeclared() {
        let mut scopes = NamespaceScopes::new(7);
        scopes.push_scope();
        scopes.pop_scope();
        assert_eq!(scopes.resolve("xml"), Some(7));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("a:b"), ("a", "b"));
        assert_eq!(split_qname("b"), ("", "b"));
    }
}
