//! Resilience layer (§4.F): circuit breaking, retry with backoff,
//! auto-reconnect, and keepalive, each independently configurable and each
//! reading time through the shared [`crate::clock::Clock`] abstraction.

pub mod circuit_breaker;
pub mod keepalive;
pub mod reconnect;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use keepalive::KeepaliveTicker;
pub use reconnect::ReconnectMonitor;
pub use retry::retry_with_backoff;
