//! Background poller thread
//!
//! Runs a tick closure at a fixed interval until stopped. Stopping sets a
//! shared flag, wakes the thread and joins it, so no tick is running once
//! [`AutoUpdater::stop`] returns.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const THREAD_NAME: &str = "livexml-updater";

#[derive(Debug)]
pub struct AutoUpdater {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl AutoUpdater {
    /// Spawn the poller; `tick` runs once per `interval`
    pub fn spawn<F>(interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                tracing::debug!(interval_ms = interval.as_millis() as u64, "auto-updater started");
                while !flag.load(Ordering::Acquire) {
                    thread::park_timeout(interval);
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    tick();
                }
                tracing::debug!("auto-updater stopped");
            })?;
        Ok(Self { shutdown, handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Release);
        self.handle.thread().unpark();
        if self.handle.join().is_err() {
            tracing::warn!("auto-updater thread panicked");
        }
    }
}
