//! Navigable contexts
//!
//! A query from an [`ElementContext`] yields a sequence of [`Context`]s:
//! elements become new element contexts with their own cursor and a copy of
//! the namespace registry, attribute values and character data become
//! terminal [`ValueContext`]s.
//!
//! ```text
//! ElementContext ──select_all──► adapter::evaluate ──► ResultPosition
//!       ▲                                                   │
//!       └──────────── Context::Element / Context::Value ◄───┘
//! ```

pub mod adapter;
pub mod batch;
pub mod namespace;
pub mod text;

use std::fmt;
use std::sync::Arc;

use crate::config::Settings;
use crate::error::QueryError;
use crate::index::{Cursor, Document};

pub use adapter::ResultPosition;
pub use namespace::NamespaceRegistry;

/// Operations shared by every kind of context
pub trait XmlContext {
    /// Every match of `xpath`, in document order
    fn select_all(&self, xpath: &str) -> Result<Vec<Context>, QueryError>;

    /// Markup for this context; indented when `formatted` is set
    fn to_text(&self, formatted: bool) -> String;

    /// The single match of `xpath`, or `None` when nothing matches
    ///
    /// More than one match is an [`QueryError::AmbiguousSelect`] error.
    fn select(&self, xpath: &str) -> Result<Option<Context>, QueryError> {
        let mut results = self.select_all(xpath)?;
        match results.len() {
            0 | 1 => Ok(results.pop()),
            count => Err(QueryError::AmbiguousSelect {
                xpath: xpath.to_string(),
                count,
            }),
        }
    }

    /// Canonical markup
    fn as_text(&self) -> String {
        self.to_text(false)
    }
}

/// A queryable scope positioned on one element
#[derive(Clone)]
pub struct ElementContext {
    cursor: Cursor,
    namespaces: NamespaceRegistry,
    xpath: Option<String>,
    settings: Arc<Settings>,
}

impl ElementContext {
    /// Context on the root element of `doc`
    pub fn from_document(doc: Arc<Document>, settings: Arc<Settings>) -> Self {
        Self::with_namespaces(doc, settings, &NamespaceRegistry::new())
    }

    /// Context on the root element, with `extra` registered over any
    /// namespaces detected on the root element
    pub(crate) fn with_namespaces(
        doc: Arc<Document>,
        settings: Arc<Settings>,
        extra: &NamespaceRegistry,
    ) -> Self {
        let mut namespaces = if settings.options.register_document_namespaces {
            NamespaceRegistry::from_document_root(&doc)
        } else {
            NamespaceRegistry::new()
        };
        namespaces.extend_from(extra);
        Self {
            cursor: Cursor::new(doc),
            namespaces,
            xpath: None,
            settings,
        }
    }

    pub fn register_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.namespaces.register(prefix, uri);
    }

    /// Qualified name of the element
    pub fn name(&self) -> &str {
        self.cursor.name()
    }

    /// The query this context was produced by; `None` for a document root
    pub fn xpath(&self) -> Option<&str> {
        self.xpath.as_deref()
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn document(&self) -> &Arc<Document> {
        self.cursor.document()
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    fn derive(&self, position: ResultPosition, xpath: &str) -> Context {
        match position {
            ResultPosition::Element(cursor) => Context::Element(ElementContext {
                cursor,
                namespaces: self.namespaces.clone(),
                xpath: Some(xpath.to_string()),
                settings: Arc::clone(&self.settings),
            }),
            ResultPosition::Value(text) => Context::Value(ValueContext { text }),
        }
    }
}

impl XmlContext for ElementContext {
    fn select_all(&self, xpath: &str) -> Result<Vec<Context>, QueryError> {
        let positions = adapter::evaluate(&self.cursor, &self.namespaces, &self.settings.cache, xpath)?;
        Ok(positions.map(|position| self.derive(position, xpath)).collect())
    }

    fn to_text(&self, formatted: bool) -> String {
        let indent = formatted.then_some(self.settings.options.indent);
        text::reconstruct(self.document(), self.cursor.current_index(), indent)
    }
}

impl fmt::Debug for ElementContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementContext")
            .field("name", &self.name())
            .field("index", &self.cursor.current_index())
            .field("depth", &self.document().depth(self.cursor.current_node()))
            .field("xpath", &self.xpath)
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

impl fmt::Display for ElementContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// A terminal scalar result: an attribute value, character data or the
/// string value of a scalar expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueContext {
    text: String,
}

impl ValueContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for ValueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One result of a query
#[derive(Debug, Clone)]
pub enum Context {
    Element(ElementContext),
    Value(ValueContext),
}

impl Context {
    pub fn is_value(&self) -> bool {
        matches!(self, Context::Value(_))
    }

    pub fn as_element(&self) -> Option<&ElementContext> {
        match self {
            Context::Element(elem) => Some(elem),
            Context::Value(_) => None,
        }
    }

    pub fn into_element(self) -> Option<ElementContext> {
        match self {
            Context::Element(elem) => Some(elem),
            Context::Value(_) => None,
        }
    }

    /// Text of a value context
    pub fn value(&self) -> Option<&str> {
        match self {
            Context::Element(_) => None,
            Context::Value(value) => Some(value.value()),
        }
    }

    /// Register a namespace on an element context; value contexts refuse
    pub fn register_namespace(
        &mut self,
        prefix: impl Into<String>,
        uri: impl Into<String>,
    ) -> Result<(), QueryError> {
        match self {
            Context::Element(elem) => {
                elem.register_namespace(prefix, uri);
                Ok(())
            }
            Context::Value(_) => Err(QueryError::UnsupportedOperation {
                operation: "register_namespace",
            }),
        }
    }
}

impl XmlContext for Context {
    fn select_all(&self, xpath: &str) -> Result<Vec<Context>, QueryError> {
        match self {
            Context::Element(elem) => elem.select_all(xpath),
            Context::Value(_) => Err(QueryError::UnsupportedOperation {
                operation: "select_all",
            }),
        }
    }

    fn select(&self, xpath: &str) -> Result<Option<Context>, QueryError> {
        match self {
            Context::Element(elem) => elem.select(xpath),
            Context::Value(_) => Err(QueryError::UnsupportedOperation { operation: "select" }),
        }
    }

    fn to_text(&self, formatted: bool) -> String {
        match self {
            Context::Element(elem) => elem.to_text(formatted),
            Context::Value(value) => value.text.clone(),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Element(elem) => fmt::Display::fmt(elem, f),
            Context::Value(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl From<ElementContext> for Context {
    fn from(elem: ElementContext) -> Self {
        Context::Element(elem)
    }
}

impl From<ValueContext> for Context {
    fn from(value: ValueContext) -> Self {
        Context::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    const BOOKS: &str = "<b:books xmlns:b=\"urn:books\"><b:book id=\"1\"><title>One</title></b:book><b:book id=\"2\"><title>Two</title></b:book></b:books>";

    #[test]
    fn test_select_contract() {
        let root = parse_str(BOOKS).unwrap();
        assert!(root.select("/b:books/b:missing").unwrap().is_none());
        let one = root.select("b:book[@id='2']/title").unwrap().unwrap();
        assert_eq!(one.as_text(), "<title>Two</title>");
        let err = root.select("b:book").unwrap_err();
        assert_eq!(err.ambiguous_count(), Some(2));
    }

    #[test]
    fn test_derived_context_is_relative() {
        let root = parse_str(BOOKS).unwrap();
        let book = root.select("b:book[2]").unwrap().unwrap();
        let title = book.select("title/text()").unwrap().unwrap();
        assert_eq!(title.value(), Some("Two"));
        assert_eq!(book.select_all("/b:books/b:book").unwrap().len(), 2);
    }

    #[test]
    fn test_derived_context_remembers_query() {
        let root = parse_str(BOOKS).unwrap();
        assert_eq!(root.xpath(), None);
        let book = root.select("b:book[1]").unwrap().and_then(Context::into_element).unwrap();
        assert_eq!(book.xpath(), Some("b:book[1]"));
        assert_eq!(book.name(), "b:book");
    }

    #[test]
    fn test_namespace_isolation() {
        let mut root = parse_str("<r xmlns:p=\"urn:p\"><a><p:x/></a><a/></r>").unwrap();
        root.register_namespace("q", "urn:p");
        let mut first = root.select("a[1]").unwrap().unwrap();
        let second = root.select("a[2]").unwrap().unwrap();

        first.register_namespace("z", "urn:p").unwrap();
        assert_eq!(first.select_all("z:x").unwrap().len(), 1);
        assert!(matches!(second.select("z:x"), Err(QueryError::InvalidSyntax { .. })));
        assert!(matches!(root.select("//z:x"), Err(QueryError::InvalidSyntax { .. })));
        assert_eq!(first.select_all("q:x").unwrap().len(), 1);
    }

    #[test]
    fn test_value_is_terminal() {
        let root = parse_str("<r k=\"v\"/>").unwrap();
        let mut value = root.select("@k").unwrap().unwrap();
        assert!(value.is_value());
        assert_eq!(value.to_string(), "v");
        assert_eq!(value.as_text(), "v");
        assert_eq!(
            value.select("x").unwrap_err(),
            QueryError::UnsupportedOperation { operation: "select" }
        );
        assert_eq!(
            value.select_all("x").unwrap_err(),
            QueryError::UnsupportedOperation { operation: "select_all" }
        );
        assert_eq!(
            value.register_namespace("p", "urn:p").unwrap_err(),
            QueryError::UnsupportedOperation { operation: "register_namespace" }
        );
    }

    #[test]
    fn test_display_is_canonical() {
        let root = parse_str("<r>\n  <a>x</a>\n</r>").unwrap();
        assert_eq!(root.to_string(), "<r><a>x</a></r>");
        let a = root.select("a").unwrap().unwrap();
        assert_eq!(format!("{a}"), "<a>x</a>");
    }

    #[test]
    fn test_debug_shows_position() {
        let root = parse_str("<r><a><b/></a></r>").unwrap();
        let b = root.select("a/b").unwrap().and_then(Context::into_element).unwrap();
        let debug = format!("{b:?}");
        assert!(debug.contains("name: \"b\""), "{debug}");
        assert!(debug.contains("depth: 2"), "{debug}");
    }

    #[test]
    fn test_root_namespaces_detected() {
        let root = parse_str(BOOKS).unwrap();
        assert_eq!(root.namespaces().resolve("b"), Some("urn:books"));
    }
}
