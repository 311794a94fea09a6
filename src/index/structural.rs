//! Structural Index - Main index structure
//!
//! Stores the entire XML document structure as offsets into the original input.

use std::ops::Range;

use super::element::{ChildRef, IndexAttribute, IndexElement, IndexText, NO_NAMESPACE, NO_NODE};

/// The structural index of an XML document
///
/// - Elements stored contiguously in document order (index 0 is the root)
/// - Attributes stored contiguously, referenced by (start, count)
/// - Text nodes stored separately, linked via ChildRef
/// - Children stored as a flat list for each element
#[derive(Debug, Default)]
pub struct StructuralIndex {
    pub elements: Vec<IndexElement>,
    /// Text nodes (includes text, CDATA, comments, PIs)
    pub texts: Vec<IndexText>,
    pub attributes: Vec<IndexAttribute>,
    /// Interned namespace URIs, referenced by the `ns` fields
    pub namespaces: Vec<Box<str>>,
    /// (start, count) into children_data, indexed by element
    children_ranges: Vec<(u32, u32)>,
    children_data: Vec<ChildRef>,
    /// Root element index (None until the first start tag)
    pub root: Option<u32>,
}

impl StructuralIndex {
    pub fn with_capacity(elements: usize, texts: usize, attributes: usize) -> Self {
        Self {
            elements: Vec::with_capacity(elements),
            texts: Vec::with_capacity(texts),
            attributes: Vec::with_capacity(attributes),
            namespaces: Vec::new(),
            // rebuilt in build_children_from_parents
            children_ranges: Vec::new(),
            children_data: Vec::new(),
            root: None,
        }
    }

    #[inline]
    pub fn get_element(&self, idx: u32) -> Option<&IndexElement> {
        self.elements.get(idx as usize)
    }

    #[inline]
    pub fn get_text(&self, idx: u32) -> Option<&IndexText> {
        self.texts.get(idx as usize)
    }

    #[inline]
    pub fn get_attribute(&self, idx: u32) -> Option<&IndexAttribute> {
        self.attributes.get(idx as usize)
    }

    /// Indexes of an element's attributes, including namespace declarations
    #[inline]
    pub fn attribute_range(&self, elem_idx: u32) -> Range<u32> {
        match self.get_element(elem_idx) {
            Some(elem) => elem.attr_start..elem.attr_start + elem.attr_count,
            None => 0..0,
        }
    }

    #[inline]
    pub fn element_attributes(&self, elem_idx: u32) -> &[IndexAttribute] {
        let range = self.attribute_range(elem_idx);
        self.attributes
            .get(range.start as usize..range.end as usize)
            .unwrap_or_default()
    }

    /// Resolve an interned namespace id
    #[inline]
    pub fn namespace_uri(&self, ns: u32) -> Option<&str> {
        if ns == NO_NAMESPACE {
            return None;
        }
        self.namespaces.get(ns as usize).map(|uri| &**uri)
    }

    /// Iterate over children of an element in document order
    pub fn children(&self, elem_idx: u32) -> ChildIter<'_> {
        let (start, count) = self
            .children_ranges
            .get(elem_idx as usize)
            .copied()
            .unwrap_or((0, 0));
        ChildIter {
            index: self,
            data_idx: start as usize,
            end_idx: start.saturating_add(count) as usize,
        }
    }

    /// Children of an element as a slice, for positional sibling lookups
    pub fn children_slice(&self, elem_idx: u32) -> &[ChildRef] {
        let (start, count) = self
            .children_ranges
            .get(elem_idx as usize)
            .copied()
            .unwrap_or((0, 0));
        self.children_data
            .get(start as usize..(start + count) as usize)
            .unwrap_or_default()
    }

    /// Iterate over all descendants of an element (depth-first, document order)
    pub fn descendants(&self, elem_idx: u32) -> DescendantIter<'_> {
        let mut stack = Vec::with_capacity(32);
        stack.extend(self.children_slice(elem_idx).iter().rev().copied());
        DescendantIter { index: self, stack }
    }

    #[inline]
    pub fn parent(&self, elem_idx: u32) -> Option<u32> {
        self.get_element(elem_idx)
            .map(|e| e.parent)
            .filter(|&p| p != NO_NODE)
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn text_count(&self) -> usize {
        self.texts.len()
    }

    #[inline]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    // === Builder methods (used by IndexBuilder) ===

    pub(crate) fn add_element(&mut self, elem: IndexElement) -> u32 {
        let idx = self.elements.len() as u32;
        self.elements.push(elem);
        idx
    }

    pub(crate) fn add_text(&mut self, text: IndexText) -> u32 {
        let idx = self.texts.len() as u32;
        self.texts.push(text);
        idx
    }

    pub(crate) fn add_attribute(&mut self, attr: IndexAttribute) -> u32 {
        let idx = self.attributes.len() as u32;
        self.attributes.push(attr);
        idx
    }

    /// Intern a namespace URI, returning its id
    pub(crate) fn intern_namespace(&mut self, uri: &str) -> u32 {
        match self.namespaces.iter().position(|known| &**known == uri) {
            Some(pos) => pos as u32,
            None => {
                self.namespaces.push(uri.into());
                (self.namespaces.len() - 1) as u32
            }
        }
    }

    /// Release unused capacity from the initial size estimates
    pub(crate) fn shrink_to_fit(&mut self) {
        self.elements.shrink_to_fit();
        self.texts.shrink_to_fit();
        self.attributes.shrink_to_fit();
        self.children_ranges.shrink_to_fit();
        self.children_data.shrink_to_fit();
    }

    /// Build children_data and children_ranges from the parent links
    ///
    /// Each parent's children end up sorted by byte offset, which is
    /// document order for mixed content (e.g. `<p>A<b/>C</p>`).
    pub(crate) fn build_children_from_parents(&mut self) {
        let num_elements = self.elements.len();
        if num_elements == 0 {
            return;
        }

        let mut counts = vec![0u32; num_elements];
        let element_parents = self.elements.iter().map(|e| e.parent);
        let text_parents = self.texts.iter().map(|t| t.parent);
        for parent in element_parents.chain(text_parents) {
            if let Some(count) = counts.get_mut(parent as usize) {
                *count += 1;
            }
        }

        let total: u32 = counts.iter().sum();
        self.children_ranges = Vec::with_capacity(num_elements);
        let mut offset = 0u32;
        for &count in &counts {
            self.children_ranges.push((offset, count));
            offset += count;
        }
        self.children_data = vec![ChildRef::element(0); total as usize];

        let mut placed = vec![0u32; num_elements];
        let elements = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.parent, ChildRef::element(i as u32)));
        let texts = self
            .texts
            .iter()
            .enumerate()
            .map(|(i, t)| (t.parent, ChildRef::text(i as u32)));
        for (parent, child) in elements.chain(texts) {
            let parent = parent as usize;
            if parent >= num_elements {
                continue;
            }
            let (start, _) = self.children_ranges[parent];
            self.children_data[(start + placed[parent]) as usize] = child;
            placed[parent] += 1;
        }

        for &(start, count) in &self.children_ranges {
            if count > 1 {
                let slice = &mut self.children_data[start as usize..(start + count) as usize];
                slice.sort_by_key(|child| {
                    if child.is_text() {
                        self.texts[child.index() as usize].span.offset
                    } else {
                        self.elements[child.index() as usize].name.offset
                    }
                });
            }
        }
    }
}

/// Iterator over children of an element
pub struct ChildIter<'a> {
    index: &'a StructuralIndex,
    data_idx: usize,
    end_idx: usize,
}

impl Iterator for ChildIter<'_> {
    type Item = ChildRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data_idx >= self.end_idx {
            return None;
        }
        let child = *self.index.children_data.get(self.data_idx)?;
        self.data_idx += 1;
        Some(child)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end_idx.saturating_sub(self.data_idx);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChildIter<'_> {}

/// Iterator over descendants (depth-first)
pub struct DescendantIter<'a> {
    index: &'a StructuralIndex,
    stack: Vec<ChildRef>,
}

impl Iterator for DescendantIter<'_> {
    type Item = ChildRef;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.stack.pop()?;
        if child.is_element() {
            let children = self.index.children_slice(child.index());
            self.stack.extend(children.iter().rev().copied());
        }
        Some(child)
    }
}
