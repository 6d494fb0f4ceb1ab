//! Injectable clock (§9 "Clock abstraction"): the circuit breaker, retry
//! jitter, token bucket and reconnect monitor all read time through this
//! trait instead of calling `Instant::now()` directly, so tests can advance
//! a fake clock deterministically (Testable Property 5, 6, 9).

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock the test harness can advance by hand; `sleep` is a no-op so
/// timing-sensitive tests run instantly.
#[derive(Debug, Clone)]
pub struct MockClock {
    inner: Arc<Mutex<Instant>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut guard = self.inner.lock().expect("mock clock lock poisoned");
        *guard += duration;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.inner.lock().expect("mock clock lock poisoned")
    }

    fn sleep(&self, _duration: Duration) {}
}

pub type SharedClock = Arc<dyn Clock>;
