//! Bounded retry with backoff for transient failures.
//!
//! Only upload, network, and rate-limit failures are retried. Everything
//! else in the error taxonomy requires human correction, so it surfaces
//! immediately.

use std::time::Duration;

use tracing::warn;

use crate::tools::ToolResult;

/// Retry budget for transient failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts before giving up (the first try counts).
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = self.multiplier.powi(exponent as i32);
        Duration::from_millis((self.base_delay_ms as f64 * factor) as u64)
    }
}

/// Run an operation, retrying transient failures until the budget runs out.
///
/// Fatal errors and the final transient failure are returned unchanged, so
/// the caller sees the same error it would have seen without retries.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> ToolResult<T>
where
    F: FnMut() -> ToolResult<T>,
{
    let mut attempt: u32 = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
