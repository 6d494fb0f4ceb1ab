//! Retry with exponential backoff and jitter (§4.F): `delay = initial *
//! multiplier^(attempt-1)`, clamped to `max_delay`, scaled by a random
//! factor in `[1, 1+jitter]`. Only [`ClientError::is_retryable`] conditions
//! are retried; everything else returns on the first attempt.

use rand::Rng;

use crate::clock::SharedClock;
use crate::config::RetryPolicy;
use crate::error::ClientError;

fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> std::time::Duration {
    let base = policy.initial_delay.as_secs_f64() * policy.multiplier.powi(attempt as i32 - 1);
    let capped = base.min(policy.max_delay.as_secs_f64());
    let jitter_factor = 1.0 + rand::thread_rng().gen_range(0.0..=policy.jitter);
    std::time::Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

/// Runs `op` up to `policy.max_attempts` times, sleeping with backoff
/// between attempts, and stops early on a non-retryable error.
pub fn retry_with_backoff<T>(
    policy: &RetryPolicy,
    clock: &SharedClock,
    mut op: impl FnMut() -> Result<T, ClientError>,
) -> Result<T, ClientError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && err.is_retryable() => {
                clock.sleep(backoff_delay(policy, attempt));
            }
            Err(err) => return Err(err),
        }
    }
}
