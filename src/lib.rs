//! livexml - navigable, re-queryable XML contexts with live reload
//!
//! A parsed document is exposed as an [`ElementContext`]. Querying it with
//! XPath yields further contexts: elements, which can be queried again
//! relative to their own position, or terminal values (attribute values,
//! character data, scalar results). Any element context can be turned back
//! into markup, canonical or indented.
//!
//! [`RootContext`] binds a context to a file and swaps in a freshly parsed
//! document when the file changes, either on request or from a background
//! poller. [`ManagedDocument`] does the same lazily on each access.
//!
//! Layers:
//! - `core` / `index`: strict scanner and structural index over the source
//! - `xpath`: XPath 1.0 compiler and evaluator over the index
//! - `context`: namespace registry, result classification, markup rebuild
//! - `live`: file-backed documents and the auto-updater thread

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod index;
pub mod live;
pub mod xpath;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use config::{Indent, Options, Settings};
pub use context::{Context, ElementContext, NamespaceRegistry, ValueContext, XmlContext};
pub use error::{Error, ParseError, QueryError, Result};
pub use index::Document;
pub use live::{ManagedDocument, RootContext};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Entry Points
// ============================================================================

/// Parse a string into a context on its root element
pub fn parse_str(xml: &str) -> Result<ElementContext, ParseError> {
    parse_str_with(xml, Options::default())
}

pub fn parse_str_with(xml: &str, options: Options) -> Result<ElementContext, ParseError> {
    let doc = Document::parse_str(xml)?;
    Ok(ElementContext::from_document(Arc::new(doc), Settings::new(options)))
}

/// Parse UTF-8 bytes into a context on their root element
pub fn parse_bytes(bytes: impl Into<Vec<u8>>) -> Result<ElementContext, ParseError> {
    let doc = Document::parse(bytes.into())?;
    Ok(ElementContext::from_document(Arc::new(doc), Settings::new(Options::default())))
}

/// Read and parse a file once; the context does not follow later changes
pub fn parse_file(path: impl AsRef<Path>) -> Result<ElementContext, ParseError> {
    let doc = live::read_document(path.as_ref())?;
    Ok(ElementContext::from_document(doc, Settings::new(Options::default())))
}

/// Open a reloadable root context on a file
pub fn open(path: impl Into<PathBuf>) -> Result<RootContext, ParseError> {
    RootContext::open(path)
}

/// Open a root context with its auto-updater already running
pub fn watch(path: impl Into<PathBuf>) -> Result<RootContext> {
    RootContext::open_with(path, Options::from_env().auto_update(true))
}

/// Open a document that reloads itself lazily when queried
pub fn managed(path: impl Into<PathBuf>) -> Result<ManagedDocument, ParseError> {
    ManagedDocument::open(path)
}
