//! Self-refreshing root context over an XML file

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use super::state::LiveDocument;
use super::updater::AutoUpdater;
use crate::config::{Options, Settings};
use crate::context::{batch, Context, ElementContext, XmlContext};
use crate::error::{Error, ParseError, QueryError};

/// Root context bound to a file
///
/// Queries always run against the most recently loaded document. The
/// document is replaced by [`update`](Self::update), called either directly
/// or by the auto-updater thread when the file's modification time moves
/// past the last load.
pub struct RootContext {
    live: Arc<LiveDocument>,
    updater: Mutex<Option<AutoUpdater>>,
}

impl RootContext {
    /// Load `path` with default options
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ParseError> {
        let live = LiveDocument::load(path.into(), Settings::new(Options::default()))?;
        Ok(Self::from_live(live))
    }

    /// Load `path`, starting the auto-updater when `options.auto_update` is set
    pub fn open_with(path: impl Into<PathBuf>, options: Options) -> Result<Self, Error> {
        let auto_update = options.auto_update;
        let root = Self::from_live(LiveDocument::load(path.into(), Settings::new(options))?);
        if auto_update {
            root.start_auto_update().map_err(Error::AutoUpdate)?;
        }
        Ok(root)
    }

    fn from_live(live: LiveDocument) -> Self {
        Self {
            live: Arc::new(live),
            updater: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        self.live.path()
    }

    pub fn options(&self) -> &Options {
        self.live.settings().options()
    }

    /// When the current document was loaded
    pub fn loaded_at(&self) -> SystemTime {
        self.live.loaded_at()
    }

    /// Whether the file was modified after the current document was loaded,
    /// or now carries a different mtime than it had at that load
    pub fn was_changed(&self) -> bool {
        self.live.was_changed()
    }

    /// Reparse the file now
    ///
    /// On failure the previous document stays loaded and keeps answering
    /// queries.
    pub fn update(&self) -> Result<(), ParseError> {
        self.live.update()
    }

    /// Start polling the file in the background; no-op when already running
    pub fn start_auto_update(&self) -> io::Result<()> {
        let mut slot = self.updater.lock();
        if slot.as_ref().is_some_and(|updater| !updater.is_finished()) {
            return Ok(());
        }
        if let Some(finished) = slot.take() {
            finished.stop();
        }
        let live = Arc::clone(&self.live);
        let interval = self.options().poll_interval;
        *slot = Some(AutoUpdater::spawn(interval, move || live.refresh())?);
        Ok(())
    }

    /// Stop the poller, waiting for a reload in progress to finish
    pub fn stop_auto_update(&self) {
        let updater = self.updater.lock().take();
        if let Some(updater) = updater {
            updater.stop();
        }
    }

    pub fn is_auto_updating(&self) -> bool {
        self.updater
            .lock()
            .as_ref()
            .is_some_and(|updater| !updater.is_finished())
    }

    /// Register a namespace on this root; it stays registered across reloads
    /// and takes precedence over namespaces detected in the document
    pub fn register_namespace(&self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.live.register_namespace(prefix.into(), uri.into());
    }

    /// The current document as a detached element context
    pub fn snapshot(&self) -> ElementContext {
        self.live.snapshot()
    }

    /// Parallel `select_all` over one consistent document version
    pub fn xmap<K: Clone + Send + Sync>(
        &self,
        queries: &[(K, &str)],
    ) -> Result<Vec<(K, Vec<Context>)>, QueryError> {
        batch::xmap(&self.snapshot(), queries)
    }
}

impl XmlContext for RootContext {
    fn select_all(&self, xpath: &str) -> Result<Vec<Context>, QueryError> {
        self.live.with_context(|ctx| ctx.select_all(xpath))
    }

    fn to_text(&self, formatted: bool) -> String {
        self.live.with_context(|ctx| ctx.to_text(formatted))
    }
}

impl Drop for RootContext {
    fn drop(&mut self) {
        self.stop_auto_update();
    }
}

impl fmt::Debug for RootContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootContext")
            .field("path", &self.path())
            .field("loaded_at", &self.loaded_at())
            .field("auto_updating", &self.is_auto_updating())
            .finish()
    }
}
