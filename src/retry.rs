use std::{fmt::Display, future::Future};

/// RetryPolicy
///
/// Re-runs a fallible async operation up to a fixed number of attempts. Whether a
/// failure is worth another attempt is decided by a classifier supplied per call, so
/// the same policy serves any error type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    attempts: u32,
}

impl RetryPolicy {
    /// Builds a policy allowing `attempts` runs in total. Zero is clamped to one.
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// run
    ///
    /// Calls `op` with the 1-based attempt number until it succeeds, fails with an
    /// error `is_retryable` rejects, or the attempt budget is spent. The last error is
    /// returned unchanged.
    pub async fn run<T, E, C, F, Fut>(&self, is_retryable: C, mut op: F) -> Result<T, E>
    where
        E: Display,
        C: Fn(&E) -> bool,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.attempts && is_retryable(&err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.attempts,
                        error = %err,
                        "transient failure, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, error = %err, "giving up after retries");
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DB_ATTEMPTS)
    }
}
