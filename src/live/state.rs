//! File-backed document state shared by reloading handles

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use crate::config::Settings;
use crate::context::{ElementContext, NamespaceRegistry};
use crate::error::ParseError;
use crate::index::Document;

/// Read and index a file
pub(crate) fn read_document(path: &Path) -> Result<Arc<Document>, ParseError> {
    let bytes = fs::read(path).map_err(|err| ParseError::io(path, err))?;
    let len = bytes.len();
    let doc = Document::parse(bytes)?;
    tracing::debug!(
        path = %path.display(),
        bytes = len,
        elements = doc.index().element_count(),
        "loaded document"
    );
    Ok(Arc::new(doc))
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified())
}

/// The current context and the time it was loaded, always replaced together
struct Loaded {
    context: ElementContext,
    loaded_at: SystemTime,
    /// File modification time seen just before the read
    mtime: Option<SystemTime>,
}

pub(crate) struct LiveDocument {
    path: PathBuf,
    settings: Arc<Settings>,
    state: RwLock<Loaded>,
    /// Serializes whole reloads so two of them never interleave
    update_lock: Mutex<()>,
    /// Registrations made on the handle; reapplied after every reload
    user_namespaces: Mutex<NamespaceRegistry>,
}

impl LiveDocument {
    pub(crate) fn load(path: PathBuf, settings: Arc<Settings>) -> Result<Self, ParseError> {
        let loaded_at = SystemTime::now();
        let mtime = modified(&path).ok();
        let doc = read_document(&path)?;
        let context = ElementContext::from_document(doc, Arc::clone(&settings));
        Ok(Self {
            path,
            settings,
            state: RwLock::new(Loaded {
                context,
                loaded_at,
                mtime,
            }),
            update_lock: Mutex::new(()),
            user_namespaces: Mutex::new(NamespaceRegistry::new()),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub(crate) fn loaded_at(&self) -> SystemTime {
        self.state.read().loaded_at
    }

    /// Whether the file's modification time is newer than the last load.
    /// An unreadable file counts as unchanged.
    ///
    /// File systems stamp mtimes from a coarse clock, so a write landing
    /// just after a load can carry an mtime older than `loaded_at`. Any
    /// mtime different from the one seen at load therefore also counts as
    /// a change. A write within the same clock tick as that load stays
    /// invisible until the next write.
    pub(crate) fn was_changed(&self) -> bool {
        let (loaded_at, mtime) = {
            let state = self.state.read();
            (state.loaded_at, state.mtime)
        };
        match modified(&self.path) {
            Ok(modified) => modified > loaded_at || Some(modified) != mtime,
            Err(err) => {
                tracing::trace!(path = %self.path.display(), error = %err, "cannot stat document");
                false
            }
        }
    }

    /// Reparse the file and swap it in; on failure the current context stays
    pub(crate) fn update(&self) -> Result<(), ParseError> {
        let _guard = self.update_lock.lock();
        // Taken before reading so a write racing the read is seen next time
        let loaded_at = SystemTime::now();
        let mtime = modified(&self.path).ok();
        let doc = read_document(&self.path)?;
        let user = self.user_namespaces.lock().clone();
        let context = ElementContext::with_namespaces(doc, Arc::clone(&self.settings), &user);
        *self.state.write() = Loaded {
            context,
            loaded_at,
            mtime,
        };
        tracing::info!(path = %self.path.display(), "reloaded document");
        Ok(())
    }

    /// Reload if the file changed; a failure is logged and the old
    /// document kept
    pub(crate) fn refresh(&self) {
        if !self.was_changed() {
            return;
        }
        if let Err(err) = self.update() {
            tracing::warn!(path = %self.path.display(), error = %err, "reload failed, keeping previous document");
        }
    }

    pub(crate) fn register_namespace(&self, prefix: String, uri: String) {
        let _guard = self.update_lock.lock();
        self.user_namespaces.lock().register(prefix.clone(), uri.clone());
        self.state.write().context.register_namespace(prefix, uri);
    }

    /// Run `f` against the current context under the read lock
    pub(crate) fn with_context<T>(&self, f: impl FnOnce(&ElementContext) -> T) -> T {
        f(&self.state.read().context)
    }

    pub(crate) fn snapshot(&self) -> ElementContext {
        self.with_context(ElementContext::clone)
    }
}
