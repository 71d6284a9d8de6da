//! Retry with exponential backoff for rate-limited model calls.
//!
//! Errors are classified by their rendered text. Anything that reads like a
//! throttling response is retried after a doubling delay; everything else
//! is returned untouched on the first failure. [`RetryingProvider`] applies
//! the policy to every call of a wrapped [`Provider`].

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use nugget_config::RetryConfig;
use nugget_core::error::ProviderError;
use nugget_core::event::{DomainEvent, EventBus};
use nugget_core::provider::{Provider, ProviderRequest, ProviderResponse};
use nugget_telemetry::RateLimitCounter;
use tracing::{debug, warn};

/// Substrings (matched case-insensitively) that mark an error as throttling.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "ratelimit",
    "too many requests",
    "429",
];

/// How an error should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Throttled upstream; worth retrying after a delay.
    RateLimited,
    /// Anything else; surfaced immediately.
    Fatal,
}

/// Classify an error by its rendered text.
pub fn classify(error: &impl Display) -> ErrorClass {
    let text = error.to_string().to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| text.contains(m)) {
        ErrorClass::RateLimited
    } else {
        ErrorClass::Fatal
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryError<E> {
    #[error("still rate limited after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("{0}")]
    Fatal(E),
}

/// Attempt bookkeeping for a single wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts made so far.
    pub attempt: u32,
    /// How long to wait before the next attempt.
    pub next_delay: Duration,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed, the first one included.
    pub max_attempts: u32,
    /// Wait before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_delay: Duration::from_secs(config.min_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// A policy with at least one attempt.
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay,
        }
    }

    /// Delay before retry `n` (1-based): `min(min_delay * 2^(n-1), max_delay)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` under this policy, counting every rate-limit hit on `counter`.
    pub async fn run<T, E, F, Fut>(
        &self,
        counter: &RateLimitCounter,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_observed(
            |_| {
                counter.increment();
            },
            op,
        )
        .await
    }

    /// Run `op` under this policy, calling `on_rate_limit` with the attempt
    /// number each time a throttling error comes back.
    pub async fn run_observed<T, E, F, Fut, H>(
        &self,
        mut on_rate_limit: H,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(&RetryState),
    {
        let mut state = RetryState {
            attempt: 0,
            next_delay: self.min_delay.min(self.max_delay),
        };

        loop {
            state.attempt += 1;
            let error = match op().await {
                Ok(value) => {
                    if state.attempt > 1 {
                        debug!(attempt = state.attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if classify(&error) == ErrorClass::Fatal {
                return Err(RetryError::Fatal(error));
            }

            on_rate_limit(&state);

            if state.attempt >= self.max_attempts {
                warn!(
                    attempts = state.attempt,
                    error = %error,
                    "Rate limit persisted, giving up"
                );
                return Err(RetryError::Exhausted {
                    attempts: state.attempt,
                    last: error,
                });
            }

            warn!(
                attempt = state.attempt,
                max_attempts = self.max_attempts,
                delay_secs = state.next_delay.as_secs_f64(),
                "Rate limited, backing off"
            );
            tokio::time::sleep(state.next_delay).await;
            state.next_delay = state.next_delay.saturating_mul(2).min(self.max_delay);
        }
    }
}

/// A provider decorator that retries rate-limited calls.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
    counter: RateLimitCounter,
    events: Option<Arc<EventBus>>,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy, counter: RateLimitCounter) -> Self {
        Self {
            inner,
            policy,
            counter,
            events: None,
        }
    }

    /// Publish a `RateLimited` event for every throttled attempt.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let max_attempts = self.policy.max_attempts;
        let on_rate_limit = |state: &RetryState| {
            self.counter.increment();
            if let Some(events) = &self.events {
                events.publish(DomainEvent::RateLimited {
                    attempt: state.attempt,
                    max_attempts,
                    timestamp: Utc::now(),
                });
            }
        };

        let result = self
            .policy
            .run_observed(on_rate_limit, || {
                let inner = &self.inner;
                let request = request.clone();
                async move { inner.complete(request).await }
            })
            .await;

        result.map_err(|e| match e {
            RetryError::Exhausted { attempts, last } => ProviderError::RateLimitExhausted {
                attempts,
                message: last.to_string(),
            },
            RetryError::Fatal(original) => original,
        })
    }
}
