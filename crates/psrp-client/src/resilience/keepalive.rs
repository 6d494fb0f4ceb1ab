//! Keepalive ticker (§4.F): a background thread sends a pool-scoped
//! keepalive message on a fixed interval for as long as the session stays
//! open. Stoppable, and `wait_complete` lets a caller block until the
//! ticker thread has actually exited (useful in tests and for orderly
//! shutdown before tearing down the pool it writes through).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::clock::SharedClock;

/// Drives a `send_keepalive` closure every `interval` until stopped.
pub struct KeepaliveTicker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeepaliveTicker {
    pub fn start(
        interval: Duration,
        clock: SharedClock,
        mut send_keepalive: impl FnMut() -> bool + Send + 'static,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_loop = stop.clone();

        let handle = std::thread::spawn(move || {
            while !stop_loop.load(Ordering::Relaxed) {
                clock.sleep(interval);
                if stop_loop.load(Ordering::Relaxed) {
                    break;
                }
                if !send_keepalive() {
                    break;
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Blocks until the ticker thread has exited, implying `stop()` was
    /// already called or `send_keepalive` returned `false`.
    pub fn wait_complete(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for KeepaliveTicker {
    fn drop(&mut self) {
        self.stop();
        self.wait_complete();
    }
}
