//! Compiled expression cache
//!
//! Compilation depends on the prefix declarations in scope, so entries are
//! keyed by the expression text together with the namespace snapshot it
//! was compiled against.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::compiler::{compile, CompiledExpr};
use super::XPathResult;

type CacheKey = (String, Vec<(String, String)>);

pub struct CompileCache {
    entries: Mutex<LruCache<CacheKey, Arc<CompiledExpr>>>,
}

impl CompileCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Compile `xpath` against `namespaces`, reusing an earlier compilation
    /// when one exists. Failed compilations are not cached.
    pub fn compile(
        &self,
        namespaces: &[(String, String)],
        xpath: &str,
    ) -> XPathResult<Arc<CompiledExpr>> {
        let key = (xpath.to_string(), namespaces.to_vec());
        if let Some(hit) = self.entries.lock().get(&key) {
            return Ok(Arc::clone(hit));
        }

        tracing::debug!(xpath, namespaces = namespaces.len(), "compiling xpath");
        let compiled = Arc::new(compile(namespaces, xpath)?);
        self.entries.lock().put(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CompileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("CompileCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
