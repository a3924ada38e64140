//! Bounded exponential backoff for tracker mutations.
//!
//! A failure is classified by [`RetryClassify`]: rate-limit failures are
//! retried after `base_delay * 2^attempt`, authorization failures abort on the
//! spot, and everything else propagates unchanged.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::sync_config::{DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `RetryClass` values.
pub enum RetryClass {
    Retryable,
    Abort,
    Fatal,
}

/// Classifies a failed attempt for [`BackoffPolicy`].
pub trait RetryClassify {
    fn retry_class(&self) -> RetryClass;
}

#[derive(Debug, Error)]
/// Terminal failure of a call run under [`BackoffPolicy`].
pub enum BackoffError<E>
where
    E: std::error::Error + 'static,
{
    #[error("not authorized after {attempts} attempt(s): {source}")]
    Unauthorized {
        attempts: usize,
        #[source]
        source: E,
    },
    #[error("still rate limited after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: usize,
        #[source]
        source: E,
    },
    #[error("{source}")]
    Failed {
        attempts: usize,
        #[source]
        source: E,
    },
}

impl<E> BackoffError<E>
where
    E: std::error::Error + 'static,
{
    pub fn attempts(&self) -> usize {
        match self {
            Self::Unauthorized { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn into_last_error(self) -> E {
        match self {
            Self::Unauthorized { source, .. }
            | Self::Exhausted { source, .. }
            | Self::Failed { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Public struct `BackoffPolicy` used across Tau forum sync components.
pub struct BackoffPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS)
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Delay after the `attempt`-th failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.min(16) as u32;
        self.base_delay.saturating_mul(2_u32.saturating_pow(exponent))
    }

    /// Runs `call` until it succeeds or the policy gives up, sleeping on the
    /// tokio timer between rate-limited attempts.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, call: F) -> Result<T, BackoffError<E>>
    where
        E: std::error::Error + RetryClassify + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with_sleep(operation, call, tokio::time::sleep)
            .await
    }

    pub async fn run_with_sleep<T, E, F, Fut, S, SleepFut>(
        &self,
        operation: &str,
        mut call: F,
        mut sleep: S,
    ) -> Result<T, BackoffError<E>>
    where
        E: std::error::Error + RetryClassify + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        S: FnMut(Duration) -> SleepFut,
        SleepFut: Future<Output = ()>,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            match error.retry_class() {
                RetryClass::Abort => {
                    return Err(BackoffError::Unauthorized {
                        attempts: attempt,
                        source: error,
                    });
                }
                RetryClass::Fatal => {
                    return Err(BackoffError::Failed {
                        attempts: attempt,
                        source: error,
                    });
                }
                RetryClass::Retryable if attempt >= self.max_attempts => {
                    return Err(BackoffError::Exhausted {
                        attempts: attempt,
                        source: error,
                    });
                }
                RetryClass::Retryable => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "rate limited, backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
