//! Index Builder
//!
//! Builds a StructuralIndex from scan events and enforces the structural
//! well-formedness rules the scanner cannot see on its own: matching end
//! tags, a single root element, no character data outside it, unique
//! attributes, and bound namespace prefixes.
//!
//! Memory-efficient: builds children from parent links after the scan,
//! avoiding temporary buffers during construction.

use super::element::{
    attr_flags, element_flags, text_flags, IndexAttribute, IndexElement, IndexText, NO_NODE,
};
use super::namespace::{ns, split_qname, NamespaceScopes};
use super::span::Span;
use super::structural::StructuralIndex;
use crate::core::entities::normalize_attribute;
use crate::core::unified_scanner::{ScanHandler, UnifiedScanner};
use crate::error::ParseError;

pub struct IndexBuilder<'a> {
    index: StructuralIndex,
    input: &'a str,
    /// Stack of open element indices
    stack: Vec<u32>,
    /// Previous sibling element at each depth (for linking siblings)
    prev_sibling_at_depth: Vec<Option<u32>>,
    scopes: NamespaceScopes<'a>,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(input: &'a str) -> Self {
        // ~1 element per 35 bytes, whitespace between tags doubles the text nodes
        let estimated_elements = (input.len() / 35).max(16);
        let mut index = StructuralIndex::with_capacity(
            estimated_elements,
            estimated_elements * 2,
            (estimated_elements * 2) / 5,
        );
        let xml_uri = index.intern_namespace(ns::XML);

        Self {
            index,
            input,
            stack: Vec::with_capacity(32),
            prev_sibling_at_depth: Vec::with_capacity(32),
            scopes: NamespaceScopes::new(xml_uri),
        }
    }

    /// Finish building and return the index
    pub fn finish(mut self) -> Result<StructuralIndex, ParseError> {
        if let Some(&open) = self.stack.last() {
            let elem = self.index.elements[open as usize];
            return Err(ParseError::malformed(
                elem.name.offset as usize,
                format!("unclosed element <{}>", elem.name.as_str(self.input)),
            ));
        }
        if self.index.root.is_none() {
            return Err(ParseError::NoRootElement);
        }

        self.index.build_children_from_parents();
        self.index.shrink_to_fit();

        tracing::debug!(
            elements = self.index.element_count(),
            texts = self.index.text_count(),
            attributes = self.index.attribute_count(),
            namespaces = self.index.namespaces.len(),
            "built structural index"
        );
        Ok(self.index)
    }

    #[inline]
    fn current_parent(&self) -> u32 {
        self.stack.last().copied().unwrap_or(NO_NODE)
    }

    fn str(&self, span: Span) -> &'a str {
        span.as_str(self.input)
    }

    /// Bind the `xmlns` declarations among `attrs` in the current scope
    fn declare_namespaces(&mut self, attrs: &[(Span, Span)]) -> Result<(), ParseError> {
        for &(name, value) in attrs {
            let qname = self.str(name);
            let prefix = match qname.strip_prefix("xmlns") {
                Some("") => "",
                Some(rest) => match rest.strip_prefix(':') {
                    Some(prefix) => prefix,
                    None => continue,
                },
                None => continue,
            };
            let uri = normalize_attribute(self.str(value));
            if prefix == "xmlns" || (prefix == "xml" && uri != ns::XML) {
                return Err(ParseError::malformed(
                    name.offset as usize,
                    format!("cannot redeclare the `{prefix}` prefix"),
                ));
            }
            let id = if uri.is_empty() {
                if !prefix.is_empty() {
                    return Err(ParseError::malformed(
                        value.offset as usize,
                        format!("empty namespace URI for prefix `{prefix}`"),
                    ));
                }
                super::element::NO_NAMESPACE
            } else {
                self.index.intern_namespace(&uri)
            };
            self.scopes.declare(prefix, id);
        }
        Ok(())
    }

    fn resolve_prefix(&self, name: Span, is_attribute: bool) -> Result<u32, ParseError> {
        let (prefix, _) = split_qname(self.str(name));
        if prefix.is_empty() && is_attribute {
            return Ok(super::element::NO_NAMESPACE);
        }
        self.scopes.resolve(prefix).ok_or_else(|| {
            ParseError::malformed(
                name.offset as usize,
                format!("unbound namespace prefix `{prefix}`"),
            )
        })
    }

    fn add_attributes(&mut self, elem_idx: u32, attrs: &[(Span, Span)]) -> Result<(), ParseError> {
        for (i, &(name, value)) in attrs.iter().enumerate() {
            let qname = self.str(name);
            if attrs[..i].iter().any(|(prev, _)| self.str(*prev) == qname) {
                return Err(ParseError::malformed(
                    name.offset as usize,
                    format!("duplicate attribute `{qname}`"),
                ));
            }

            let mut attr = IndexAttribute::new(name, value, elem_idx);
            if qname == "xmlns" || qname.starts_with("xmlns:") {
                attr.flags |= attr_flags::IS_NAMESPACE_DECL;
            } else {
                attr.ns = self.resolve_prefix(name, true)?;
            }
            if memchr::memchr(b'&', value.slice(self.input.as_bytes())).is_some() {
                attr.flags |= attr_flags::NEEDS_ENTITY_DECODE;
            }
            self.index.add_attribute(attr);
        }
        Ok(())
    }

    fn ensure_depth(&mut self, depth: usize) {
        while self.prev_sibling_at_depth.len() <= depth {
            self.prev_sibling_at_depth.push(None);
        }
    }

    fn outside_root(&self) -> bool {
        self.stack.is_empty()
    }
}

impl ScanHandler for IndexBuilder<'_> {
    fn start_element(
        &mut self,
        name: Span,
        attrs: &[(Span, Span)],
        is_empty: bool,
    ) -> Result<(), ParseError> {
        if self.outside_root() && self.index.root.is_some() {
            return Err(ParseError::malformed(
                name.offset as usize,
                "more than one root element",
            ));
        }

        let depth = self.stack.len() as u32;
        let parent = self.current_parent();
        let elem_idx = self.index.elements.len() as u32;

        self.scopes.push_scope();
        self.declare_namespaces(attrs)?;

        let mut elem = IndexElement::new(name, parent, depth);
        elem.ns = self.resolve_prefix(name, false)?;
        if is_empty {
            elem.flags |= element_flags::IS_EMPTY;
        }
        elem.attr_start = self.index.attributes.len() as u32;
        elem.attr_count = attrs.len() as u32;
        self.add_attributes(elem_idx, attrs)?;

        // Link siblings at this depth
        self.ensure_depth(depth as usize);
        if let Some(prev_idx) = self.prev_sibling_at_depth[depth as usize] {
            elem.prev_sibling = prev_idx;
            self.index.elements[prev_idx as usize].next_sibling = elem_idx;
        }
        if let Some(parent_elem) = self.index.elements.get_mut(parent as usize) {
            if parent_elem.first_child == NO_NODE {
                parent_elem.first_child = elem_idx;
            }
            parent_elem.last_child = elem_idx;
        }
        self.index.add_element(elem);

        if self.index.root.is_none() {
            self.index.root = Some(elem_idx);
        }

        self.prev_sibling_at_depth[depth as usize] = Some(elem_idx);
        for prev in self.prev_sibling_at_depth.iter_mut().skip(depth as usize + 1) {
            *prev = None;
        }

        if is_empty {
            self.scopes.pop_scope();
        } else {
            self.stack.push(elem_idx);
        }
        Ok(())
    }

    fn end_element(&mut self, name: Span) -> Result<(), ParseError> {
        let Some(open) = self.stack.pop() else {
            return Err(ParseError::malformed(
                name.offset as usize,
                format!("unexpected end tag </{}>", self.str(name)),
            ));
        };
        let expected = self.str(self.index.elements[open as usize].name);
        if self.str(name) != expected {
            return Err(ParseError::malformed(
                name.offset as usize,
                format!(
                    "mismatched end tag: expected </{expected}>, found </{}>",
                    self.str(name)
                ),
            ));
        }
        self.scopes.pop_scope();
        Ok(())
    }

    fn text(&mut self, span: Span, needs_entity_decode: bool) -> Result<(), ParseError> {
        let is_whitespace = span
            .slice(self.input.as_bytes())
            .iter()
            .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
        if self.outside_root() {
            if is_whitespace {
                return Ok(());
            }
            return Err(ParseError::malformed(
                span.offset as usize,
                "character data outside the root element",
            ));
        }

        let mut flags = 0;
        if needs_entity_decode {
            flags |= text_flags::NEEDS_ENTITY_DECODE;
        }
        if is_whitespace {
            flags |= text_flags::IS_WHITESPACE;
        }
        self.index
            .add_text(IndexText::new(span, self.current_parent(), flags));
        Ok(())
    }

    fn cdata(&mut self, span: Span) -> Result<(), ParseError> {
        if self.outside_root() {
            return Err(ParseError::malformed(
                span.offset as usize,
                "CDATA section outside the root element",
            ));
        }
        self.index
            .add_text(IndexText::new(span, self.current_parent(), text_flags::IS_CDATA));
        Ok(())
    }

    /// Comments in the prolog or epilog are not part of the element tree
    fn comment(&mut self, span: Span) -> Result<(), ParseError> {
        if !self.outside_root() {
            self.index.add_text(IndexText::new(
                span,
                self.current_parent(),
                text_flags::IS_COMMENT,
            ));
        }
        Ok(())
    }

    fn processing_instruction(&mut self, target: Span, content: Span) -> Result<(), ParseError> {
        if !self.outside_root() {
            self.index
                .add_text(IndexText::pi(content, target.len, self.current_parent()));
        }
        Ok(())
    }
}

/// Scan `input` and build its structural index
pub fn build_index(input: &str) -> Result<StructuralIndex, ParseError> {
    let mut builder = IndexBuilder::new(input);
    UnifiedScanner::new(input.as_bytes()).scan(&mut builder)?;
    builder.finish()
}
