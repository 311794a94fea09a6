//! Element-positioned navigator over a shared document
//!
//! A [`Cursor`] is an `Arc` to the document plus the index of the element it
//! sits on. Cloning one is cheap and the clone moves independently, so
//! every context owns its own position.

use std::borrow::Cow;
use std::sync::Arc;

use super::document::{Document, NodeId, NodeKind};

#[derive(Debug, Clone)]
pub struct Cursor {
    doc: Arc<Document>,
    element: u32,
}

impl Cursor {
    /// Cursor on the root element
    pub fn new(doc: Arc<Document>) -> Self {
        let element = doc.root();
        Self { doc, element }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    /// Element index the cursor sits on
    pub fn current_index(&self) -> u32 {
        self.element
    }

    pub fn current_node(&self) -> NodeId {
        NodeId::Element(self.element)
    }

    /// Element name at the current position
    pub fn name(&self) -> &str {
        self.doc.name(self.current_node())
    }

    /// Jump to an element index; the position is unchanged when it is out of range
    pub fn recover_node(&mut self, index: u32) -> bool {
        if self.doc.element(index).is_none() {
            return false;
        }
        self.element = index;
        true
    }

    /// Source text at a node with references decoded; attribute values are
    /// whitespace-normalized as well
    pub fn normalized_string_at(&self, node: NodeId) -> Cow<'_, str> {
        let kind = self.doc.kind(node);
        if kind == NodeKind::Attribute || kind.is_text() {
            self.doc.string_value(node)
        } else {
            Cow::Borrowed(self.doc.raw(node))
        }
    }
}
