//! Timing decorator.

use crate::core::{ProcessingContext, Step};
use crate::errors::ProcessorError;
use crate::processors::{Processor, ProcessorRef};
use crate::utils::duration_ms;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Running statistics collected by a [`TimingDecorator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    /// Number of timed calls.
    pub call_count: u64,
    /// Sum of all call durations.
    pub total: Duration,
    /// Shortest call, zero if nothing was timed.
    pub min: Duration,
    /// Longest call.
    pub max: Duration,
}

impl TimingStats {
    /// Mean call duration, zero if nothing was timed.
    #[must_use]
    pub fn average(&self) -> Duration {
        if self.call_count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.call_count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn record(&mut self, elapsed: Duration) {
        self.min = if self.call_count == 0 {
            elapsed
        } else {
            self.min.min(elapsed)
        };
        self.max = self.max.max(elapsed);
        self.total += elapsed;
        self.call_count += 1;
    }
}

/// Measures how long the wrapped processor takes.
///
/// Every call, successful or not, is timed. The duration is written to the
/// item's `processing_time_ms` metadata; control flow is never altered.
#[derive(Debug)]
pub struct TimingDecorator {
    name: String,
    inner: ProcessorRef,
    stats: Mutex<TimingStats>,
}

impl TimingDecorator {
    /// Metadata key holding the last measured duration.
    pub const METADATA_KEY: &'static str = "processing_time_ms";

    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: ProcessorRef) -> Self {
        Self {
            name: format!("timing({})", inner.name()),
            inner,
            stats: Mutex::new(TimingStats::default()),
        }
    }

    /// Sets the decorator name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns a copy of the statistics.
    #[must_use]
    pub fn stats(&self) -> TimingStats {
        *self.stats.lock()
    }

    /// Resets the statistics.
    pub fn reset_stats(&self) {
        *self.stats.lock() = TimingStats::default();
    }
}

impl Processor for TimingDecorator {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let started = Instant::now();
        let outcome = self.inner.process(ctx);
        let elapsed = started.elapsed();

        self.stats.lock().record(elapsed);
        ctx.item
            .add_metadata(Self::METADATA_KEY, serde_json::json!(duration_ms(elapsed)));
        outcome
    }
}
