//! Lazily reloading document handle

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::state::LiveDocument;
use crate::config::{Options, Settings};
use crate::context::{Context, ElementContext, XmlContext};
use crate::error::{ParseError, QueryError};

/// A file-backed document that checks for changes on every access
///
/// No thread is involved: when the file's modification time has moved past
/// the last load, the next query reloads it first. A failed reload keeps the
/// previous document.
pub struct ManagedDocument {
    live: LiveDocument,
}

impl ManagedDocument {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ParseError> {
        Self::open_with(path, Options::default())
    }

    pub fn open_with(path: impl Into<PathBuf>, options: Options) -> Result<Self, ParseError> {
        let live = LiveDocument::load(path.into(), Settings::new(options))?;
        Ok(Self { live })
    }

    pub fn path(&self) -> &Path {
        self.live.path()
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.live.loaded_at()
    }

    pub fn register_namespace(&self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.live.register_namespace(prefix.into(), uri.into());
    }

    /// The up-to-date document as a detached element context
    pub fn unmanaged(&self) -> ElementContext {
        self.live.refresh();
        self.live.snapshot()
    }
}

impl XmlContext for ManagedDocument {
    fn select_all(&self, xpath: &str) -> Result<Vec<Context>, QueryError> {
        self.live.refresh();
        self.live.with_context(|ctx| ctx.select_all(xpath))
    }

    fn to_text(&self, formatted: bool) -> String {
        self.live.refresh();
        self.live.with_context(|ctx| ctx.to_text(formatted))
    }
}

impl fmt::Debug for ManagedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedDocument")
            .field("path", &self.path())
            .field("loaded_at", &self.loaded_at())
            .finish()
    }
}
