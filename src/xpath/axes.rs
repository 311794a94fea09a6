//! XPath Axes Implementation
//!
//! Every axis but `namespace` (which yields nothing). Forward axes list
//! their nodes in document order, reverse axes nearest first, which is the
//! order predicates count positions in.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use crate::index::{Document, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate(doc: &Document, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children(context).collect(),
        Axis::Descendant => doc.descendants(context).collect(),
        Axis::DescendantOrSelf => std::iter::once(context)
            .chain(doc.descendants(context))
            .collect(),
        Axis::Parent => doc.parent(context).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, context).collect(),
        Axis::AncestorOrSelf => std::iter::once(context)
            .chain(ancestors(doc, context))
            .collect(),
        Axis::FollowingSibling => doc.following_siblings(context),
        Axis::PrecedingSibling => doc.preceding_siblings(context),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => doc.attributes(context).collect(),
        Axis::Namespace => Vec::new(),
    }
}

fn ancestors(doc: &Document, context: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(doc.parent(context), move |&n| doc.parent(n))
}

/// following:: axis - nodes after the context in document order,
/// excluding its descendants
fn following_axis(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;

    // An attribute precedes its owner's content
    if let NodeId::Attribute(_) = context {
        let Some(owner) = doc.parent(context) else {
            return result;
        };
        result.extend(doc.descendants(owner));
        current = owner;
    }

    loop {
        for sibling in doc.following_siblings(current) {
            result.push(sibling);
            result.extend(doc.descendants(sibling));
        }
        match doc.parent(current) {
            Some(NodeId::Document) | None => break,
            Some(parent) => current = parent,
        }
    }
    result
}

/// preceding:: axis - nodes before the context in document order,
/// excluding its ancestors, nearest first
fn preceding_axis(doc: &Document, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = match context {
        NodeId::Attribute(_) => match doc.parent(context) {
            Some(owner) => owner,
            None => return result,
        },
        _ => context,
    };

    loop {
        for sibling in doc.preceding_siblings(current) {
            let subtree: Vec<NodeId> = doc.descendants(sibling).collect();
            result.extend(subtree.into_iter().rev());
            result.push(sibling);
        }
        match doc.parent(current) {
            Some(NodeId::Document) | None => break,
            Some(parent) => current = parent,
        }
    }
    result
}

/// Check if a node matches a node test on the given axis
pub fn matches_node_test(doc: &Document, node: NodeId, test: &CompiledNodeTest, axis: Axis) -> bool {
    let kind = doc.kind(node);
    let principal = if axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    };

    match test {
        CompiledNodeTest::Principal => kind == principal,
        CompiledNodeTest::Name { uri, local } => {
            kind == principal
                && doc.local_name(node) == local
                && doc.namespace_uri(node) == uri.as_deref()
        }
        CompiledNodeTest::NamespaceWildcard(uri) => {
            kind == principal && doc.namespace_uri(node) == Some(uri.as_str())
        }
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => kind.is_text(),
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_deref().is_none_or(|t| doc.name(node) == t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a=0 b=1 c=2 d=3 e=4
    const XML: &str = "<a><b><c/></b><d k=\"v\"/><e/></a>";

    fn doc() -> Document {
        Document::parse_str(XML).unwrap()
    }

    fn elements(nodes: &[NodeId]) -> Vec<u32> {
        nodes
            .iter()
            .filter_map(|n| match n {
                NodeId::Element(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_child_and_descendant_axes() {
        let doc = doc();
        let root = NodeId::Element(0);
        assert_eq!(elements(&navigate(&doc, root, Axis::Child)), vec![1, 3, 4]);
        assert_eq!(elements(&navigate(&doc, root, Axis::Descendant)), vec![1, 2, 3, 4]);
        assert_eq!(
            elements(&navigate(&doc, NodeId::Document, Axis::Descendant)),
            vec![0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_ancestor_axis() {
        let doc = doc();
        let ancestors = navigate(&doc, NodeId::Element(2), Axis::Ancestor);
        assert_eq!(
            ancestors,
            vec![NodeId::Element(1), NodeId::Element(0), NodeId::Document]
        );
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = doc();
        assert_eq!(elements(&navigate(&doc, NodeId::Element(2), Axis::Following)), vec![3, 4]);
        assert_eq!(elements(&navigate(&doc, NodeId::Element(4), Axis::Preceding)), vec![3, 2, 1]);
        assert_eq!(elements(&navigate(&doc, NodeId::Attribute(0), Axis::Following)), vec![4]);
        assert_eq!(elements(&navigate(&doc, NodeId::Attribute(0), Axis::Preceding)), vec![2, 1]);
    }

    #[test]
    fn test_attribute_axis_and_principal_kind() {
        let doc = doc();
        let attrs = navigate(&doc, NodeId::Element(3), Axis::Attribute);
        assert_eq!(attrs, vec![NodeId::Attribute(0)]);
        assert!(matches_node_test(&doc, attrs[0], &CompiledNodeTest::Principal, Axis::Attribute));
        assert!(!matches_node_test(&doc, attrs[0], &CompiledNodeTest::Principal, Axis::Child));
        let named = CompiledNodeTest::Name {
            uri: None,
            local: "k".into(),
        };
        assert!(matches_node_test(&doc, attrs[0], &named, Axis::Attribute));
    }
}
