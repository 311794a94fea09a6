//! Structural Index Node Types
//!
//! Compact structures storing XML structure as offsets into the original
//! input. Namespace URIs are interned in the index and referenced by id.

use super::span::Span;

/// Flags for IndexElement
pub mod element_flags {
    /// Element is empty (self-closing)
    pub const IS_EMPTY: u16 = 0x0001;
}

/// Flags for IndexText
pub mod text_flags {
    /// Text needs entity decoding (contains &amp; etc.)
    pub const NEEDS_ENTITY_DECODE: u16 = 0x0001;
    pub const IS_CDATA: u16 = 0x0002;
    pub const IS_COMMENT: u16 = 0x0004;
    pub const IS_PI: u16 = 0x0008;
    /// Text consists only of XML whitespace
    pub const IS_WHITESPACE: u16 = 0x0010;
}

/// Flags for IndexAttribute
pub mod attr_flags {
    /// `xmlns` or `xmlns:prefix`; not visible on the attribute axis
    pub const IS_NAMESPACE_DECL: u16 = 0x0001;
    pub const NEEDS_ENTITY_DECODE: u16 = 0x0002;
}

/// Sentinel value for "no node"
pub const NO_NODE: u32 = u32::MAX;

/// Sentinel namespace id for names in no namespace
pub const NO_NAMESPACE: u32 = u32::MAX;

/// An element in the structural index
///
/// Sibling and child links only follow element nodes; mixed content
/// (text, comments) is reached through `StructuralIndex::children`.
#[derive(Debug, Clone, Copy)]
pub struct IndexElement {
    /// Qualified tag name span
    pub name: Span,
    /// Parent element index (NO_NODE for root)
    pub parent: u32,
    pub first_child: u32,
    pub last_child: u32,
    pub next_sibling: u32,
    pub prev_sibling: u32,
    /// Start index in attributes array
    pub attr_start: u32,
    pub attr_count: u32,
    /// Depth in document tree (0 = root element)
    pub depth: u32,
    /// Interned namespace URI id (NO_NAMESPACE if unqualified)
    pub ns: u32,
    /// Flags (see element_flags)
    pub flags: u16,
}

impl IndexElement {
    #[inline]
    pub fn new(name: Span, parent: u32, depth: u32) -> Self {
        Self {
            name,
            parent,
            first_child: NO_NODE,
            last_child: NO_NODE,
            next_sibling: NO_NODE,
            prev_sibling: NO_NODE,
            attr_start: 0,
            attr_count: 0,
            depth,
            ns: NO_NAMESPACE,
            flags: 0,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent == NO_NODE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flags & element_flags::IS_EMPTY != 0
    }
}

impl Default for IndexElement {
    fn default() -> Self {
        Self::new(Span::empty(), NO_NODE, 0)
    }
}

/// A character-data node (text, CDATA, comment, PI)
#[derive(Debug, Clone, Copy)]
pub struct IndexText {
    /// Content span; for a PI this covers the target and data
    pub span: Span,
    /// Parent element index
    pub parent: u32,
    /// Length of the PI target within `span` (0 for other kinds)
    pub target_len: u32,
    /// Flags (see text_flags)
    pub flags: u16,
}

impl IndexText {
    #[inline]
    pub fn new(span: Span, parent: u32, flags: u16) -> Self {
        Self {
            span,
            parent,
            target_len: 0,
            flags,
        }
    }

    #[inline]
    pub fn pi(content: Span, target_len: u32, parent: u32) -> Self {
        Self {
            span: content,
            parent,
            target_len,
            flags: text_flags::IS_PI,
        }
    }

    #[inline]
    pub fn needs_decode(&self) -> bool {
        self.flags & text_flags::NEEDS_ENTITY_DECODE != 0
    }

    #[inline]
    pub fn is_cdata(&self) -> bool {
        self.flags & text_flags::IS_CDATA != 0
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        self.flags & text_flags::IS_COMMENT != 0
    }

    #[inline]
    pub fn is_pi(&self) -> bool {
        self.flags & text_flags::IS_PI != 0
    }

    /// Text or CDATA, i.e. an XPath text node
    #[inline]
    pub fn is_character_data(&self) -> bool {
        self.flags & (text_flags::IS_COMMENT | text_flags::IS_PI) == 0
    }

    /// Plain text made only of whitespace
    #[inline]
    pub fn is_whitespace(&self) -> bool {
        self.flags & text_flags::IS_WHITESPACE != 0
    }
}

/// An attribute in the structural index
#[derive(Debug, Clone, Copy)]
pub struct IndexAttribute {
    pub name: Span,
    /// Value span, excluding the quotes
    pub value: Span,
    /// Owning element index
    pub owner: u32,
    /// Interned namespace URI id; unprefixed attributes are in no namespace
    pub ns: u32,
    /// Flags (see attr_flags)
    pub flags: u16,
}

impl IndexAttribute {
    #[inline]
    pub fn new(name: Span, value: Span, owner: u32) -> Self {
        Self {
            name,
            value,
            owner,
            ns: NO_NAMESPACE,
            flags: 0,
        }
    }

    #[inline]
    pub fn is_namespace_decl(&self) -> bool {
        self.flags & attr_flags::IS_NAMESPACE_DECL != 0
    }

    #[inline]
    pub fn needs_decode(&self) -> bool {
        self.flags & attr_flags::NEEDS_ENTITY_DECODE != 0
    }
}

/// A child reference - can be either an element or a text node
///
/// We use a discriminated union approach with the high bit of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRef(u32);

impl ChildRef {
    /// Bit flag indicating this is a text node reference
    const TEXT_BIT: u32 = 0x8000_0000;

    #[inline]
    pub const fn element(idx: u32) -> Self {
        debug_assert!(idx < Self::TEXT_BIT);
        Self(idx)
    }

    #[inline]
    pub const fn text(idx: u32) -> Self {
        debug_assert!(idx < Self::TEXT_BIT);
        Self(idx | Self::TEXT_BIT)
    }

    #[inline]
    pub const fn is_text(&self) -> bool {
        self.0 & Self::TEXT_BIT != 0
    }

    #[inline]
    pub const fn is_element(&self) -> bool {
        self.0 & Self::TEXT_BIT == 0
    }

    /// Get the index (strips the type bit)
    #[inline]
    pub const fn index(&self) -> u32 {
        self.0 & !Self::TEXT_BIT
    }
}
