//! Parsed document: owned source text plus its structural index
//!
//! Every node is addressed by a [`NodeId`]. Ordering nodes by the byte
//! offset where they start in the source gives document order directly,
//! with an element sorting before its attributes and its attributes before
//! its children.

use std::borrow::Cow;

use super::builder::build_index;
use super::element::{ChildRef, IndexAttribute, IndexElement, IndexText, NO_NODE};
use super::namespace::split_qname;
use super::structural::{ChildIter, DescendantIter, StructuralIndex};
use crate::core::entities::{decode_text, normalize_attribute};
use crate::error::ParseError;

/// A node of the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// The document node, parent of the root element
    Document,
    Element(u32),
    Attribute(u32),
    /// Text, CDATA, comment or processing instruction
    Text(u32),
}

impl NodeId {
    fn from_child(child: ChildRef) -> Self {
        if child.is_text() {
            NodeId::Text(child.index())
        } else {
            NodeId::Element(child.index())
        }
    }
}

/// XPath node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    /// Text and CDATA both count as XPath text nodes
    pub fn is_text(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::CData)
    }
}

#[derive(Debug)]
pub struct Document {
    source: Box<str>,
    index: StructuralIndex,
}

impl Document {
    /// Parse raw bytes, which must be UTF-8 (a leading BOM is allowed)
    pub fn parse(bytes: Vec<u8>) -> Result<Self, ParseError> {
        let source = String::from_utf8(bytes).map_err(|err| ParseError::InvalidUtf8 {
            offset: err.utf8_error().valid_up_to(),
        })?;
        Self::parse_string(source)
    }

    pub fn parse_str(source: &str) -> Result<Self, ParseError> {
        Self::parse_string(source.to_owned())
    }

    fn parse_string(source: String) -> Result<Self, ParseError> {
        if u32::try_from(source.len()).is_err() {
            return Err(ParseError::TooLarge { len: source.len() });
        }
        let index = build_index(&source)?;
        Ok(Self {
            source: source.into_boxed_str(),
            index,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn index(&self) -> &StructuralIndex {
        &self.index
    }

    /// Index of the root element; a parsed document always has one
    pub fn root(&self) -> u32 {
        self.index.root.unwrap_or(0)
    }

    pub(crate) fn element(&self, idx: u32) -> Option<&IndexElement> {
        self.index.get_element(idx)
    }

    pub(crate) fn text(&self, idx: u32) -> Option<&IndexText> {
        self.index.get_text(idx)
    }

    pub(crate) fn attribute(&self, idx: u32) -> Option<&IndexAttribute> {
        self.index.get_attribute(idx)
    }

    /// Whether `node` exists in this document
    pub fn contains(&self, node: NodeId) -> bool {
        match node {
            NodeId::Document => true,
            NodeId::Element(i) => self.element(i).is_some(),
            NodeId::Attribute(i) => self.attribute(i).is_some(),
            NodeId::Text(i) => self.text(i).is_some(),
        }
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        match node {
            NodeId::Document => NodeKind::Document,
            NodeId::Element(_) => NodeKind::Element,
            NodeId::Attribute(_) => NodeKind::Attribute,
            NodeId::Text(i) => match self.text(i) {
                Some(t) if t.is_comment() => NodeKind::Comment,
                Some(t) if t.is_pi() => NodeKind::ProcessingInstruction,
                Some(t) if t.is_cdata() => NodeKind::CData,
                _ => NodeKind::Text,
            },
        }
    }

    /// Sort key giving document order
    pub fn order_key(&self, node: NodeId) -> u32 {
        match node {
            NodeId::Document => 0,
            NodeId::Element(i) => self.element(i).map_or(0, |e| e.name.offset),
            NodeId::Attribute(i) => self.attribute(i).map_or(0, |a| a.name.offset),
            NodeId::Text(i) => self.text(i).map_or(0, |t| t.span.offset),
        }
    }

    /// Sort nodes into document order and drop duplicates
    pub fn sort_document_order(&self, nodes: &mut Vec<NodeId>) {
        nodes.sort_by_key(|&n| (self.order_key(n), n));
        nodes.dedup();
    }

    /// Element depth (root = 0); other nodes report their parent's depth + 1
    pub fn depth(&self, node: NodeId) -> u32 {
        match node {
            NodeId::Document => 0,
            NodeId::Element(i) => self.element(i).map_or(0, |e| e.depth),
            _ => self.parent(node).map_or(0, |p| self.depth(p) + 1),
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = match node {
            NodeId::Document => return None,
            NodeId::Element(i) => self.element(i)?.parent,
            NodeId::Attribute(i) => self.attribute(i)?.owner,
            NodeId::Text(i) => self.text(i)?.parent,
        };
        if parent == NO_NODE {
            Some(NodeId::Document)
        } else {
            Some(NodeId::Element(parent))
        }
    }

    /// Child nodes in document order
    pub fn children(&self, node: NodeId) -> Children<'_> {
        match node {
            NodeId::Document => Children {
                root: Some(self.root()),
                inner: None,
            },
            NodeId::Element(i) => Children {
                root: None,
                inner: Some(self.index.children(i)),
            },
            _ => Children {
                root: None,
                inner: None,
            },
        }
    }

    /// Descendants in document order, excluding `node` itself
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        match node {
            NodeId::Document => Descendants {
                pending_root: Some(self.root()),
                inner: None,
                doc: self,
            },
            NodeId::Element(i) => Descendants {
                pending_root: None,
                inner: Some(self.index.descendants(i)),
                doc: self,
            },
            _ => Descendants {
                pending_root: None,
                inner: None,
                doc: self,
            },
        }
    }

    /// Attributes of an element, excluding namespace declarations
    pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let range = match node {
            NodeId::Element(i) => self.index.attribute_range(i),
            _ => 0..0,
        };
        range
            .filter(|&a| self.attribute(a).is_some_and(|attr| !attr.is_namespace_decl()))
            .map(NodeId::Attribute)
    }

    /// `(prefix, uri)` for each `xmlns:prefix` declared on an element.
    /// Default namespace declarations are skipped.
    pub fn namespace_declarations(&self, node: NodeId) -> impl Iterator<Item = (&str, String)> + '_ {
        let range = match node {
            NodeId::Element(i) => self.index.attribute_range(i),
            _ => 0..0,
        };
        range.filter_map(move |a| {
            let attr = self.attribute(a).filter(|attr| attr.is_namespace_decl())?;
            let prefix = attr.name.as_str(&self.source).strip_prefix("xmlns:")?;
            let uri = normalize_attribute(attr.value.as_str(&self.source)).into_owned();
            Some((prefix, uri))
        })
    }

    /// Siblings after `node`, nearest first
    pub fn following_siblings(&self, node: NodeId) -> Vec<NodeId> {
        let (siblings, pos) = match self.sibling_position(node) {
            Some(found) => found,
            None => return Vec::new(),
        };
        siblings[pos + 1..]
            .iter()
            .map(|&c| NodeId::from_child(c))
            .collect()
    }

    /// Siblings before `node`, nearest first
    pub fn preceding_siblings(&self, node: NodeId) -> Vec<NodeId> {
        let (siblings, pos) = match self.sibling_position(node) {
            Some(found) => found,
            None => return Vec::new(),
        };
        siblings[..pos]
            .iter()
            .rev()
            .map(|&c| NodeId::from_child(c))
            .collect()
    }

    fn sibling_position(&self, node: NodeId) -> Option<(&[ChildRef], usize)> {
        if matches!(node, NodeId::Document | NodeId::Attribute(_)) {
            return None;
        }
        let Some(NodeId::Element(parent)) = self.parent(node) else {
            return None;
        };
        let siblings = self.index.children_slice(parent);
        let key = self.order_key(node);
        let pos = siblings
            .binary_search_by_key(&key, |&c| self.order_key(NodeId::from_child(c)))
            .ok()?;
        Some((siblings, pos))
    }

    /// Qualified name of an element or attribute, or a PI target
    pub fn name(&self, node: NodeId) -> &str {
        match node {
            NodeId::Element(i) => self.element(i).map_or("", |e| e.name.as_str(&self.source)),
            NodeId::Attribute(i) => self
                .attribute(i)
                .map_or("", |a| a.name.as_str(&self.source)),
            NodeId::Text(i) => match self.text(i) {
                Some(t) if t.is_pi() => {
                    let content = t.span.as_str(&self.source);
                    content.get(..t.target_len as usize).unwrap_or(content)
                }
                _ => "",
            },
            NodeId::Document => "",
        }
    }

    pub fn local_name(&self, node: NodeId) -> &str {
        match node {
            NodeId::Element(_) | NodeId::Attribute(_) => split_qname(self.name(node)).1,
            _ => self.name(node),
        }
    }

    pub fn namespace_uri(&self, node: NodeId) -> Option<&str> {
        let ns = match node {
            NodeId::Element(i) => self.element(i)?.ns,
            NodeId::Attribute(i) => self.attribute(i)?.ns,
            _ => return None,
        };
        self.index.namespace_uri(ns)
    }

    /// Source text of a node exactly as written, without decoding
    ///
    /// Text and CDATA give their content, attributes their value, comments
    /// their body and PIs their data.
    pub fn raw(&self, node: NodeId) -> &str {
        match node {
            NodeId::Document => "",
            NodeId::Element(_) => self.name(node),
            NodeId::Attribute(i) => self
                .attribute(i)
                .map_or("", |a| a.value.as_str(&self.source)),
            NodeId::Text(i) => match self.text(i) {
                Some(t) if t.is_pi() => {
                    let content = t.span.as_str(&self.source);
                    content
                        .get(t.target_len as usize..)
                        .unwrap_or_default()
                        .trim_start_matches([' ', '\t', '\n', '\r'])
                }
                Some(t) => t.span.as_str(&self.source),
                None => "",
            },
        }
    }

    /// XPath string-value of a node
    pub fn string_value(&self, node: NodeId) -> Cow<'_, str> {
        match node {
            NodeId::Document | NodeId::Element(_) => {
                let mut parts = self
                    .descendants(node)
                    .filter(|&d| self.kind(d).is_text())
                    .map(|d| self.string_value(d));
                match (parts.next(), parts.next()) {
                    (None, _) => Cow::Borrowed(""),
                    (Some(only), None) => only,
                    (Some(first), Some(second)) => {
                        let mut out = first.into_owned();
                        out.push_str(&second);
                        parts.for_each(|p| out.push_str(&p));
                        Cow::Owned(out)
                    }
                }
            }
            NodeId::Attribute(_) => normalize_attribute(self.raw(node)),
            NodeId::Text(i) => match self.text(i) {
                Some(t) if t.needs_decode() => decode_text(self.raw(node)),
                _ => Cow::Borrowed(self.raw(node)),
            },
        }
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    root: Option<u32>,
    inner: Option<ChildIter<'a>>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if let Some(root) = self.root.take() {
            return Some(NodeId::Element(root));
        }
        self.inner.as_mut()?.next().map(NodeId::from_child)
    }
}

/// Iterator over the descendants of a node
pub struct Descendants<'a> {
    pending_root: Option<u32>,
    inner: Option<DescendantIter<'a>>,
    doc: &'a Document,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if let Some(root) = self.pending_root.take() {
            self.inner = Some(self.doc.index.descendants(root));
            return Some(NodeId::Element(root));
        }
        self.inner.as_mut()?.next().map(NodeId::from_child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<a x=\"1\" xmlns:p=\"urn:p\">one<b p:y=\"2\">two</b><!--c--><?pi data?><![CDATA[<3>]]></a>";

    fn doc() -> Document {
        Document::parse_str(DOC).unwrap()
    }

    #[test]
    fn test_children_kinds() {
        let doc = doc();
        let kids: Vec<_> = doc.children(NodeId::Element(0)).collect();
        let kinds: Vec<_> = kids.iter().map(|&k| doc.kind(k)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Text,
                NodeKind::Element,
                NodeKind::Comment,
                NodeKind::ProcessingInstruction,
                NodeKind::CData
            ]
        );
        assert_eq!(
            doc.children(NodeId::Document).collect::<Vec<_>>(),
            vec![NodeId::Element(0)]
        );
    }

    #[test]
    fn test_attributes_skip_namespace_declarations() {
        let doc = doc();
        let attrs: Vec<_> = doc.attributes(NodeId::Element(0)).collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(doc.name(attrs[0]), "x");

        let b_attrs: Vec<_> = doc.attributes(NodeId::Element(1)).collect();
        assert_eq!(doc.local_name(b_attrs[0]), "y");
        assert_eq!(doc.namespace_uri(b_attrs[0]), Some("urn:p"));

        let decls: Vec<_> = doc.namespace_declarations(NodeId::Element(0)).collect();
        assert_eq!(decls, vec![("p", "urn:p".to_string())]);
    }

    #[test]
    fn test_string_values() {
        let doc = doc();
        assert_eq!(doc.string_value(NodeId::Element(0)), "onetwo<3>");
        assert_eq!(doc.string_value(NodeId::Document), "onetwo<3>");
        let pi = doc
            .children(NodeId::Element(0))
            .find(|&n| doc.kind(n) == NodeKind::ProcessingInstruction)
            .unwrap();
        assert_eq!(doc.name(pi), "pi");
        assert_eq!(doc.raw(pi), "data");
    }

    #[test]
    fn test_document_order() {
        let doc = doc();
        let mut nodes = vec![
            NodeId::Text(0),
            NodeId::Element(1),
            NodeId::Attribute(0),
            NodeId::Element(0),
            NodeId::Document,
            NodeId::Element(1),
        ];
        doc.sort_document_order(&mut nodes);
        assert_eq!(
            nodes,
            vec![
                NodeId::Document,
                NodeId::Element(0),
                NodeId::Attribute(0),
                NodeId::Text(0),
                NodeId::Element(1)
            ]
        );
    }

    #[test]
    fn test_siblings() {
        let doc = doc();
        let b = NodeId::Element(1);
        assert_eq!(doc.preceding_siblings(b), vec![NodeId::Text(0)]);
        assert_eq!(doc.following_siblings(b).len(), 3);
        assert!(doc.following_siblings(NodeId::Element(0)).is_empty());
    }

    #[test]
    fn test_parent_and_depth() {
        let doc = doc();
        assert_eq!(doc.parent(NodeId::Element(0)), Some(NodeId::Document));
        assert_eq!(doc.parent(NodeId::Attribute(0)), Some(NodeId::Element(0)));
        assert_eq!(doc.depth(NodeId::Element(1)), 1);
        assert_eq!(doc.depth(NodeId::Text(1)), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Document::parse(vec![b'<', b'a', 0xFF, b'/', b'>']),
            Err(ParseError::InvalidUtf8 { offset: 2 })
        ));
        assert!(matches!(
            Document::parse_str("   "),
            Err(ParseError::NoRootElement)
        ));
    }
}
