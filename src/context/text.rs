//! Markup reconstruction
//!
//! Rebuilds XML text for an element subtree from the structural index.
//! Traversal is depth-first in document order over an explicit stack, so
//! deep documents cannot overflow the call stack.
//!
//! Character data, attribute values, comments and PIs are emitted exactly
//! as written in the source. Whitespace-only text between child elements is
//! dropped in both modes, which keeps canonical and formatted output equal
//! once whitespace is normalized.

use crate::config::Indent;
use crate::index::{Document, NodeId, NodeKind};

enum StackEntry {
    /// Emit a node; `block` means the parent lays children out one per line
    Enter { node: NodeId, level: usize, block: bool },
    Close {
        elem: NodeId,
        level: usize,
        block_children: bool,
        block: bool,
    },
}

/// Reconstruct the markup of element `elem`
///
/// With `indent` set, elements whose content is only elements (plus
/// comments and PIs) put each child on its own line, indented one unit per
/// nesting level below `elem`. Mixed content stays inline.
///
/// Output is lossy for whitespace-only text that sits between sibling
/// elements: `<p><b>a</b> <i>b</i></p>` comes back as
/// `<p><b>a</b><i>b</i></p>`, so the string value of `p` loses its space.
pub fn reconstruct(doc: &Document, elem: u32, indent: Option<Indent>) -> String {
    let mut buf = String::with_capacity(256);
    let mut stack: Vec<StackEntry> = Vec::with_capacity(32);
    stack.push(StackEntry::Enter {
        node: NodeId::Element(elem),
        level: 0,
        block: false,
    });

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Close {
                elem,
                level,
                block_children,
                block,
            } => {
                if block_children {
                    write_indent(&mut buf, indent, level);
                }
                buf.push_str("</");
                buf.push_str(doc.name(elem));
                buf.push('>');
                if block {
                    buf.push('\n');
                }
            }
            StackEntry::Enter { node, level, block } => {
                if block {
                    write_indent(&mut buf, indent, level);
                }
                let NodeId::Element(index) = node else {
                    write_character_data(&mut buf, doc, node);
                    if block {
                        buf.push('\n');
                    }
                    continue;
                };

                write_open_tag(&mut buf, doc, index);
                let children = significant_children(doc, node);
                if children.is_empty() {
                    buf.push_str("</");
                    buf.push_str(doc.name(node));
                    buf.push('>');
                    if block {
                        buf.push('\n');
                    }
                    continue;
                }

                let block_children = indent.is_some() && lays_out_as_block(doc, &children);
                if block_children {
                    buf.push('\n');
                }
                stack.push(StackEntry::Close {
                    elem: node,
                    level,
                    block_children,
                    block,
                });
                stack.extend(children.into_iter().rev().map(|child| StackEntry::Enter {
                    node: child,
                    level: level + 1,
                    block: block_children,
                }));
            }
        }
    }

    buf
}

fn write_indent(buf: &mut String, indent: Option<Indent>, level: usize) {
    if let Some(indent) = indent {
        indent.write_levels(buf, level);
    }
}

fn write_open_tag(buf: &mut String, doc: &Document, elem: u32) {
    let source = doc.source();
    buf.push('<');
    buf.push_str(doc.name(NodeId::Element(elem)));
    // Namespace declarations included, in source order
    for attr in doc.index().element_attributes(elem) {
        let value = attr.value.as_str(source);
        let quote = if value.contains('"') { '\'' } else { '"' };
        buf.push(' ');
        buf.push_str(attr.name.as_str(source));
        buf.push('=');
        buf.push(quote);
        buf.push_str(value);
        buf.push(quote);
    }
    buf.push('>');
}

fn write_character_data(buf: &mut String, doc: &Document, node: NodeId) {
    let raw = doc.raw(node);
    match doc.kind(node) {
        NodeKind::CData => {
            buf.push_str("<![CDATA[");
            buf.push_str(raw);
            buf.push_str("]]>");
        }
        NodeKind::Comment => {
            buf.push_str("<!--");
            buf.push_str(raw);
            buf.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            buf.push_str("<?");
            buf.push_str(doc.name(node));
            if !raw.is_empty() {
                buf.push(' ');
                buf.push_str(raw);
            }
            buf.push_str("?>");
        }
        _ => buf.push_str(raw),
    }
}

/// Children worth emitting: whitespace-only text is dropped when the
/// element also has element children
fn significant_children(doc: &Document, elem: NodeId) -> Vec<NodeId> {
    let children: Vec<NodeId> = doc.children(elem).collect();
    if !children.iter().any(|c| matches!(c, NodeId::Element(_))) {
        return children;
    }
    children
        .into_iter()
        .filter(|&child| match child {
            NodeId::Text(i) => doc
                .text(i)
                .is_some_and(|t| !(t.is_character_data() && t.is_whitespace())),
            _ => true,
        })
        .collect()
}

fn lays_out_as_block(doc: &Document, children: &[NodeId]) -> bool {
    children.iter().any(|c| matches!(c, NodeId::Element(_)))
        && !children.iter().any(|&c| doc.kind(c).is_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(xml: &str) -> String {
        let doc = Document::parse_str(xml).unwrap();
        reconstruct(&doc, doc.root(), None)
    }

    fn formatted(xml: &str, indent: Indent) -> String {
        let doc = Document::parse_str(xml).unwrap();
        reconstruct(&doc, doc.root(), Some(indent))
    }

    #[test]
    fn test_canonical_drops_layout_whitespace() {
        let xml = "<a x=\"1\" y='2'>\n  <b>text</b>\n  <c/>\n</a>";
        assert_eq!(canonical(xml), "<a x=\"1\" y=\"2\"><b>text</b><c></c></a>");
    }

    #[test]
    fn test_whitespace_between_inline_siblings_is_lost() {
        let xml = "<p><b>a</b> <i>b</i>t</p>";
        let rebuilt = canonical(xml);
        assert_eq!(rebuilt, "<p><b>a</b><i>b</i>t</p>");

        let string_value = |xml: &str| {
            let doc = Document::parse_str(xml).unwrap();
            doc.string_value(NodeId::Element(doc.root())).into_owned()
        };
        assert_eq!(string_value(xml), "a bt");
        assert_eq!(string_value(&rebuilt), "abt");
    }

    #[test]
    fn test_text_kept_verbatim() {
        assert_eq!(
            canonical("<a k=\"x&amp;y\"> t &lt; u </a>"),
            "<a k=\"x&amp;y\"> t &lt; u </a>"
        );
        assert_eq!(canonical("<a>  </a>"), "<a>  </a>");
    }

    #[test]
    fn test_markup_nodes() {
        let xml = "<a><![CDATA[<raw>]]><!-- note --><?pi data?><?bare?></a>";
        assert_eq!(canonical(xml), xml);
    }

    #[test]
    fn test_quotes_preserved_when_needed() {
        assert_eq!(canonical("<a t='say \"hi\"'/>"), "<a t='say \"hi\"'></a>");
    }

    #[test]
    fn test_namespace_declarations_emitted() {
        let xml = "<p:a xmlns:p=\"urn:p\" p:k=\"v\"><p:b/></p:a>";
        assert_eq!(canonical(xml), "<p:a xmlns:p=\"urn:p\" p:k=\"v\"><p:b></p:b></p:a>");
    }

    #[test]
    fn test_nested_same_name() {
        assert_eq!(canonical("<a><a></a></a>"), "<a><a></a></a>");
        assert_eq!(canonical("<a><a>x</a></a>"), "<a><a>x</a></a>");
    }

    #[test]
    fn test_subtree_only() {
        let doc = Document::parse_str("<r><a><b/></a><c/></r>").unwrap();
        assert_eq!(reconstruct(&doc, 1, None), "<a><b></b></a>");
    }

    #[test]
    fn test_formatted_block_layout() {
        let xml = "<book id=\"bk001\"><author>Writer</author><title>The First Title</title><meta><k/></meta></book>";
        assert_eq!(
            formatted(xml, Indent::Tab),
            "<book id=\"bk001\">\n\t<author>Writer</author>\n\t<title>The First Title</title>\n\t<meta>\n\t\t<k></k>\n\t</meta>\n</book>"
        );
    }

    #[test]
    fn test_formatted_mixed_content_inline() {
        let xml = "<p>one <b>two</b> three</p>";
        assert_eq!(formatted(xml, Indent::Spaces(2)), xml);
        assert_eq!(formatted("<a>text</a>", Indent::Spaces(4)), "<a>text</a>");
    }

    #[test]
    fn test_formatted_comments_on_own_line() {
        assert_eq!(
            formatted("<a><!--c--><b/></a>", Indent::Spaces(2)),
            "<a>\n  <!--c-->\n  <b></b>\n</a>"
        );
    }
}
