//! Bounded fixed-delay retry for publisher writes

use std::thread;

use crate::config::RetryConfig;
use crate::error::{FieldGraphError, Result};

/// Run `op` up to `policy.attempts` times, sleeping `policy.delay()` between
/// tries.
///
/// Only [`FieldGraphError::is_retryable`] failures are retried; any other
/// error is returned unchanged on the spot. Running out of attempts yields
/// [`FieldGraphError::RetriesExhausted`] wrapping the last failure.
pub fn with_retry<T>(
    policy: &RetryConfig,
    operation: &str,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= attempts => {
                tracing::error!(operation, attempts, error = %e, "giving up");
                return Err(FieldGraphError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                tracing::warn!(operation, attempt, error = %e, "retrying");
                thread::sleep(policy.delay());
                attempt += 1;
            }
        }
    }
}
