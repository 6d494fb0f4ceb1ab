//! Circuit breaker (§4.F): `Closed` → `Open` after `failure_threshold`
//! consecutive failures, `Open` → `HalfOpen` after `reset_timeout` elapses,
//! `HalfOpen` → `Closed` on the next success or back to `Open` on the next
//! failure. Reads time through the injected [`Clock`] so tests can drive
//! transitions without real sleeps (Testable Property 9).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::clock::SharedClock;
use crate::config::CircuitBreakerConfig;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Guards calls to a flaky operation, failing fast once it is `Open`. A
/// disabled breaker (`CircuitBreakerConfig::enabled == false`) always
/// reports `Closed` and never trips.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: SharedClock,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        self.reevaluate(&mut inner);
        inner.state
    }

    /// Transitions `Open` to `HalfOpen` once `reset_timeout` has elapsed.
    fn reevaluate(&self, inner: &mut Inner) {
        if !self.config.enabled {
            inner.state = CircuitState::Closed;
            return;
        }
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if self.clock.now().saturating_duration_since(opened_at) >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                }
            }
        }
    }

    /// Runs `op` if the circuit permits it, recording the outcome.
    pub fn call<T>(&self, op: impl FnOnce() -> Result<T, ClientError>) -> Result<T, ClientError> {
        {
            let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
            self.reevaluate(&mut inner);
            if inner.state == CircuitState::Open {
                return Err(ClientError::CircuitOpen);
            }
        }

        match op() {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(err)
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    fn on_failure(&self) {
        if !self.config.enabled {
            return;
        }
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.consecutive_failures += 1;
        if inner.state == CircuitState::HalfOpen || inner.consecutive_failures >= self.config.failure_threshold {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(self.clock.now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::sync::Arc;

    fn breaker(threshold: u32, reset: Duration) -> (CircuitBreaker, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new());
        let config = CircuitBreakerConfig::builder()
            .enabled(true)
            .failure_threshold(threshold)
            .reset_timeout(reset)
            .build();
        (CircuitBreaker::new(config, clock.clone()), clock)
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let (breaker, _clock) = breaker(3, Duration::from_secs(10));
        for _ in 0..2 {
            let _ = breaker.call(|| Err::<(), _>(ClientError::NotConnected));
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        let _ = breaker.call(|| Err::<(), _>(ClientError::NotConnected));
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_open_fails_fast_without_calling_op() {
        let (breaker, _clock) = breaker(1, Duration::from_secs(10));
        let _ = breaker.call(|| Err::<(), _>(ClientError::NotConnected));
        assert_eq!(breaker.state(), CircuitState::Open);

        let mut called = false;
        let result = breaker.call(|| {
            called = true;
            Ok::<(), ClientError>(())
        });
        assert!(!called);
        assert!(matches!(result, Err(ClientError::CircuitOpen)));
    }

    #[test]
    fn test_half_open_after_reset_timeout_then_closes_on_success() {
        let (breaker, clock) = breaker(1, Duration::from_secs(10));
        let _ = breaker.call(|| Err::<(), _>(ClientError::NotConnected));
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(11));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let result = breaker.call(|| Ok::<(), ClientError>(()));
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let (breaker, clock) = breaker(1, Duration::from_secs(10));
        let _ = breaker.call(|| Err::<(), _>(ClientError::NotConnected));
        clock.advance(Duration::from_secs(11));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let _ = breaker.call(|| Err::<(), _>(ClientError::NotConnected));
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_disabled_breaker_never_trips() {
        let clock = Arc::new(MockClock::new());
        let config = CircuitBreakerConfig::builder().enabled(false).build();
        let breaker = CircuitBreaker::new(config, clock);
        for _ in 0..100 {
            let _ = breaker.call(|| Err::<(), _>(ClientError::NotConnected));
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
