//! File-backed, reloadable documents
//!
//! [`RootContext`] reloads on demand or from a background poller;
//! [`ManagedDocument`] reloads lazily when it is queried.

pub mod managed;
pub mod root;
pub(crate) mod state;
pub mod updater;

pub use managed::ManagedDocument;
pub use root::RootContext;
pub use updater::AutoUpdater;

pub(crate) use state::read_document;
