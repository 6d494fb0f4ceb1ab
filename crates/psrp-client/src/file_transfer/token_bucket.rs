//! Token bucket rate limiter (§4.G "Rate limiting"): capacity is one chunk
//! plus a small epsilon so a single chunk can always drain the bucket once
//! full; the bucket starts empty (slow start) rather than pre-filled.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::clock::SharedClock;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Paces writes to at most `rate` bytes/sec, blocking the calling thread via
/// [`crate::clock::Clock::sleep`] when the bucket is empty.
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    clock: SharedClock,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(rate_bytes_per_sec: f64, chunk_size: usize, clock: SharedClock) -> Self {
        let capacity = chunk_size as f64 * 1.01;
        let last_refill = clock.now();
        Self {
            rate: rate_bytes_per_sec,
            capacity,
            clock,
            state: Mutex::new(BucketState {
                tokens: 0.0,
                last_refill,
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }

    /// Blocks until `n` bytes' worth of tokens are available, then consumes
    /// them.
    pub fn acquire(&self, n: usize) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("token bucket lock poisoned");
                self.refill(&mut state);
                if state.tokens >= n as f64 {
                    state.tokens -= n as f64;
                    return;
                }
                let deficit = n as f64 - state.tokens;
                Duration::from_secs_f64((deficit / self.rate).max(0.0))
            };
            self.clock.sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::sync::Arc;

    #[test]
    fn test_starts_empty_and_must_wait_for_first_chunk() {
        let clock = Arc::new(MockClock::new());
        let bucket = TokenBucket::new(1024.0, 1024, clock.clone());

        // No time has passed yet, so nothing is available; advancing the
        // clock inside `sleep` (a no-op for MockClock) would hang forever in
        // real time, so we just assert the bucket doesn't grant for free.
        {
            let mut state = bucket.state.lock().unwrap();
            bucket.refill(&mut state);
            assert_eq!(state.tokens, 0.0);
        }
    }

    #[test]
    fn test_refill_accrues_with_elapsed_time() {
        let clock = Arc::new(MockClock::new());
        let bucket = TokenBucket::new(1024.0, 1024, clock.clone());
        clock.advance(Duration::from_secs(1));
        {
            let mut state = bucket.state.lock().unwrap();
            bucket.refill(&mut state);
            assert!((state.tokens - 1024.0).abs() < 1.0);
        }
    }

    #[test]
    fn test_capacity_caps_accrual() {
        let clock = Arc::new(MockClock::new());
        let bucket = TokenBucket::new(1024.0, 100, clock.clone());
        clock.advance(Duration::from_secs(10));
        {
            let mut state = bucket.state.lock().unwrap();
            bucket.refill(&mut state);
            assert!(state.tokens <= 101.0);
        }
    }

    #[test]
    fn test_acquire_drains_available_tokens() {
        let clock = Arc::new(MockClock::new());
        let bucket = TokenBucket::new(1024.0, 1024, clock.clone());
        clock.advance(Duration::from_secs(2));
        bucket.acquire(1024);
        let mut state = bucket.state.lock().unwrap();
        bucket.refill(&mut state);
        assert!(state.tokens < 1024.0);
    }
}
