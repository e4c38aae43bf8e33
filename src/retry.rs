//! Retrying transport for transient failures.
//!
//! [`RetryTransport`] decorates another [`Transport`] and re-sends the same request when
//! the server answers `429`, `502` or `503`, or when no response arrives at all. The
//! loop is bounded both by an attempt count and by a time budget. When either runs out,
//! the last response or error is handed back untouched.
//!
//! All methods are retried alike; there is no special casing of non-idempotent
//! requests.

use crate::error::BoxError;
use crate::rate_limit;
use crate::transport::Transport;
use async_trait::async_trait;
use http::StatusCode;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Status codes that trigger a retry.
pub const RETRY_STATUSES: [StatusCode; 3] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Default maximum number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Default time budget for all attempts of one request.
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(6000);

/// How long to wait between attempts.
///
/// # Examples
///
/// ```
/// use rokka::RetryStrategy;
/// use std::time::Duration;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(2),
///     jitter: true,
/// };
///
/// // Linear backoff: 1s, 1s, 1s...
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_secs(1),
/// };
/// ```
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Retry right away.
    Immediate,

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^(attempt - 1)` (capped at `max_delay`).
    /// Optional jitter adds randomness to prevent thundering herd.
    ExponentialBackoff {
        /// The delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },

    /// Retry with a fixed delay between attempts.
    Linear {
        /// The delay between retry attempts.
        delay: Duration,
    },

    /// Custom retry logic.
    ///
    /// Takes the retry number (1-indexed) and returns the delay before it, or `None`
    /// to stop retrying.
    Custom {
        /// Function that determines retry delay.
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl Default for RetryStrategy {
    /// 50ms doubling up to 1s, with jitter. Ten attempts fit in the default budget.
    fn default() -> Self {
        RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            jitter: true,
        }
    }
}

impl RetryStrategy {
    /// Returns the delay before the given retry, or `None` to stop retrying.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::Immediate => Some(Duration::ZERO),
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1) as u32);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    // between 50% and 100% of the delay
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay } => Some(*delay),
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }
}

/// A [`Transport`] that retries transient failures of an inner transport.
///
/// # Examples
///
/// ```
/// use rokka::{RetryStrategy, RetryTransport};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let transport = RetryTransport::new(Arc::new(reqwest::Client::new()), 5, Duration::from_secs(3))
///     .with_strategy(RetryStrategy::Linear {
///         delay: Duration::from_millis(200),
///     });
/// assert_eq!(transport.max_attempts(), 5);
/// ```
#[derive(Clone)]
pub struct RetryTransport {
    inner: Arc<dyn Transport>,
    max_attempts: usize,
    budget: Duration,
    strategy: RetryStrategy,
}

impl RetryTransport {
    /// Wraps `inner`, allowing at most `max_attempts` sends within `budget`.
    ///
    /// A `max_attempts` of zero is treated as one.
    pub fn new(inner: Arc<dyn Transport>, max_attempts: usize, budget: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            budget,
            strategy: RetryStrategy::default(),
        }
    }

    /// Wraps `inner` with 10 attempts and a 6 second budget.
    pub fn with_defaults(inner: Arc<dyn Transport>) -> Self {
        Self::new(inner, DEFAULT_MAX_ATTEMPTS, DEFAULT_BUDGET)
    }

    /// Replaces the backoff curve.
    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Maximum number of sends, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Time budget for all attempts of one request.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// The backoff curve.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Delay before retry number `attempt`, preferring the server's own hint.
    fn delay_before_retry(
        &self,
        attempt: usize,
        outcome: &Result<reqwest::Response, BoxError>,
    ) -> Option<Duration> {
        if let Ok(response) = outcome {
            if matches!(
                response.status(),
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
            ) {
                if let Some(hint) = rate_limit::wait_hint(response.headers()) {
                    return Some(hint);
                }
            }
        }
        self.strategy.delay_for_attempt(attempt)
    }
}

impl fmt::Debug for RetryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTransport")
            .field("max_attempts", &self.max_attempts)
            .field("budget", &self.budget)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Why an outcome qualifies for another attempt.
enum RetryCause<'a> {
    Status(StatusCode),
    Connection(&'a BoxError),
}

impl fmt::Display for RetryCause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCause::Status(status) => write!(f, "status {}", status.as_u16()),
            RetryCause::Connection(err) => write!(f, "connection error: {}", err),
        }
    }
}

fn retry_cause(outcome: &Result<reqwest::Response, BoxError>) -> Option<RetryCause<'_>> {
    match outcome {
        Ok(response) if RETRY_STATUSES.contains(&response.status()) => {
            Some(RetryCause::Status(response.status()))
        }
        Ok(_) => None,
        Err(err) => Some(RetryCause::Connection(err)),
    }
}

#[async_trait]
impl Transport for RetryTransport {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        let start = Instant::now();
        let mut pending = request;
        let mut attempt = 0;

        loop {
            attempt += 1;

            // streaming bodies cannot be cloned and are sent once
            let replay = if attempt < self.max_attempts {
                pending.try_clone()
            } else {
                None
            };

            let outcome = self.inner.execute(pending).await;

            let cause = match retry_cause(&outcome).map(|cause| cause.to_string()) {
                Some(cause) => cause,
                None => return outcome,
            };

            let next = match replay {
                Some(next) => next,
                None => {
                    tracing::debug!(
                        attempt = attempt,
                        cause = %cause,
                        "Not retrying request: attempts exhausted or body not replayable"
                    );
                    return outcome;
                }
            };

            let delay = match self.delay_before_retry(attempt, &outcome) {
                Some(delay)
                    if start
                        .elapsed()
                        .checked_add(delay)
                        .is_some_and(|total| total <= self.budget) =>
                {
                    delay
                }
                _ => {
                    tracing::debug!(
                        attempt = attempt,
                        cause = %cause,
                        budget_ms = self.budget.as_millis() as u64,
                        "Not retrying request: time budget exhausted"
                    );
                    return outcome;
                }
            };

            tracing::warn!(
                method = %next.method(),
                url = %next.url(),
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                cause = %cause,
                "Retrying request after delay"
            );

            // release the discarded response before waiting
            drop(outcome);
            tokio::time::sleep(delay).await;
            pending = next;
        }
    }
}
