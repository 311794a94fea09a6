//! Structural Index Module
//!
//! A memory-efficient representation of XML documents using byte offsets
//! into the original input:
//!
//! - **Zero-copy strings**: element names, attribute values and text content
//!   are (offset, length) spans into the source.
//! - **Resolved namespaces**: every element and prefixed attribute carries
//!   an interned namespace URI id computed once while building.
//! - **Cheap cursors**: a [`Cursor`] is an `Arc<Document>` plus an index.
//!
//! ## Architecture
//!
//! ```text
//! Document
//! ├── source: Box<str>
//! └── StructuralIndex
//!     ├── elements: Vec<IndexElement>
//!     ├── texts: Vec<IndexText>
//!     ├── attributes: Vec<IndexAttribute>
//!     ├── namespaces: Vec<Box<str>>
//!     └── children: flat storage of ChildRef
//! ```

pub mod builder;
pub mod cursor;
pub mod document;
pub mod element;
pub mod namespace;
pub mod span;
pub mod structural;

pub use cursor::Cursor;
pub use document::{Document, NodeId, NodeKind};
pub use span::Span;
pub use structural::StructuralIndex;
