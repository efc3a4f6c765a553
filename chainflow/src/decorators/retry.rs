//! Retry decorator with exponential backoff.

use crate::core::{ProcessingContext, Step};
use crate::errors::ProcessorError;
use crate::processors::{Processor, ProcessorRef};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Jitter strategy applied on top of the computed backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(rand::thread_rng().gen_range(0..=millis)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + rand::thread_rng().gen_range(0..=half))
            }
        }
    }
}

/// Which errors are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Retry every error.
    #[default]
    Any,
    /// Retry only errors classified as transient.
    Transient,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
    /// Default retry predicate.
    pub retry_on: RetryOn,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: JitterStrategy::None,
            retry_on: RetryOn::Any,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay_ms(mut self, delay: u64) -> Self {
        self.initial_delay_ms = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the default retry predicate.
    #[must_use]
    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Delay before retry number `retry` (1-based), before jitter.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let millis = self.initial_delay_ms as f64 * self.backoff_multiplier.max(0.0).powi(exponent);
        let capped = millis.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

type RetryPredicate = dyn Fn(&ProcessorError) -> bool + Send + Sync;

/// Re-invokes the wrapped processor while it fails.
///
/// Up to `max_retries` additional attempts are made, sleeping between them
/// on the calling thread. The context is handed to every attempt as-is, so
/// anything a failed attempt wrote stays visible to the next one. When
/// attempts are exhausted, or the predicate rejects the error, the last
/// error is returned unchanged.
pub struct RetryDecorator {
    name: String,
    inner: ProcessorRef,
    config: RetryConfig,
    predicate: Arc<RetryPredicate>,
}

impl RetryDecorator {
    /// Metadata key holding the number of retries made so far.
    pub const METADATA_KEY: &'static str = "retry_count";

    /// Wraps `inner` with `config`.
    #[must_use]
    pub fn new(inner: ProcessorRef, config: RetryConfig) -> Self {
        let predicate: Arc<RetryPredicate> = match config.retry_on {
            RetryOn::Any => Arc::new(|_: &ProcessorError| true),
            RetryOn::Transient => Arc::new(ProcessorError::is_transient),
        };
        Self {
            name: format!("retry({})", inner.name()),
            inner,
            config,
            predicate,
        }
    }

    /// Sets the decorator name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the retry predicate.
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ProcessorError) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl std::fmt::Debug for RetryDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryDecorator")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Processor for RetryDecorator {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let mut retry = 0;
        loop {
            if retry > 0 {
                ctx.item
                    .add_metadata(Self::METADATA_KEY, serde_json::json!(retry));
            }

            let err = match self.inner.process(ctx) {
                Ok(step) => return Ok(step),
                Err(err) => err,
            };

            if retry >= self.config.max_retries || !(self.predicate)(&err) {
                return Err(err);
            }

            retry += 1;
            let delay = self.config.jitter.apply(self.config.delay_for(retry));
            tracing::debug!(
                processor = %self.inner.name(),
                item_id = %ctx.item.id,
                retry,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Retrying processor"
            );
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }
}
