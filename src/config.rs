//! Runtime options
//!
//! `Options` is plain data with builder-style setters. Contexts derived from
//! one load share a single [`Settings`], which pairs the options with the
//! compiled-expression cache.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::xpath::cache::CompileCache;

/// Default interval between modification-time checks of the backing file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default number of compiled expressions kept per load.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

const POLL_INTERVAL_ENV: &str = "LIVEXML_POLL_INTERVAL_MS";
const CACHE_CAPACITY_ENV: &str = "LIVEXML_CACHE_CAPACITY";

/// Indentation unit used by formatted text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    Spaces(u8),
    Tab,
}

impl Indent {
    pub(crate) fn write_levels(self, out: &mut String, levels: usize) {
        for _ in 0..levels {
            match self {
                Indent::Spaces(n) => out.extend(std::iter::repeat_n(' ', n as usize)),
                Indent::Tab => out.push('\t'),
            }
        }
    }
}

impl Default for Indent {
    fn default() -> Self {
        Indent::Spaces(4)
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    /// How often the auto-updater checks the file's modification time.
    pub poll_interval: Duration,
    /// Indentation unit for `to_text(true)`.
    pub indent: Indent,
    /// Capacity of the compiled XPath cache.
    pub cache_capacity: NonZeroUsize,
    /// Start the auto-updater as soon as a root context is opened.
    pub auto_update: bool,
    /// Register the root element's `xmlns:prefix` declarations on load.
    pub register_document_namespaces: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            indent: Indent::default(),
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            auto_update: false,
            register_document_namespaces: true,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `LIVEXML_POLL_INTERVAL_MS` and
    /// `LIVEXML_CACHE_CAPACITY` when they hold valid numbers.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(ms) = lookup(POLL_INTERVAL_ENV).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(cap) = lookup(CACHE_CAPACITY_ENV)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(NonZeroUsize::new)
        {
            self.cache_capacity = cap;
        }
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn indent(mut self, indent: Indent) -> Self {
        self.indent = indent;
        self
    }

    pub fn cache_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }

    pub fn register_document_namespaces(mut self, enabled: bool) -> Self {
        self.register_document_namespaces = enabled;
        self
    }
}

/// Options plus the state shared by every context derived from one load.
#[derive(Debug)]
pub struct Settings {
    pub(crate) options: Options,
    pub(crate) cache: CompileCache,
}

impl Settings {
    pub fn new(options: Options) -> Arc<Self> {
        let cache = CompileCache::new(options.cache_capacity);
        Arc::new(Self { options, cache })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}
