//! Processor decorators.
//!
//! Each decorator wraps exactly one processor and is itself a
//! [`Processor`], so decorators compose by nesting. Nesting order is
//! observable: a logging decorator outside a retry decorator sees only the
//! final outcome, while one inside it sees every attempt.

mod caching;
mod logging;
mod retry;
mod timing;

pub use caching::{
    payload_cache_key, CacheConfig, CacheKeyFn, CacheStats, CachingDecorator, EvictionPolicy,
};
pub use logging::{LoggingDecorator, LoggingDecoratorConfig};
pub use retry::{JitterStrategy, RetryConfig, RetryDecorator, RetryOn};
pub use timing::{TimingDecorator, TimingStats};

use crate::processors::{Processor, ProcessorRef};
use std::sync::Arc;

/// Fluent wrapping helpers available on every processor.
///
/// ```
/// use chainflow::decorators::{ProcessorExt, RetryConfig};
/// use chainflow::processors::NoOpProcessor;
///
/// let processor = NoOpProcessor::new("work")
///     .retrying(RetryConfig::new().with_max_retries(2))
///     .timed();
/// ```
pub trait ProcessorExt: Processor + Sized + 'static {
    /// Wraps `self` in a [`TimingDecorator`].
    fn timed(self) -> TimingDecorator {
        TimingDecorator::new(Arc::new(self))
    }

    /// Wraps `self` in a [`RetryDecorator`].
    fn retrying(self, config: RetryConfig) -> RetryDecorator {
        RetryDecorator::new(Arc::new(self), config)
    }

    /// Wraps `self` in a [`CachingDecorator`].
    fn cached(self, config: CacheConfig) -> CachingDecorator {
        CachingDecorator::new(Arc::new(self), config)
    }

    /// Wraps `self` in a [`LoggingDecorator`].
    fn logged(self, config: LoggingDecoratorConfig) -> LoggingDecorator {
        LoggingDecorator::new(Arc::new(self), config)
    }

    /// Converts `self` into a shared handle.
    fn into_ref(self) -> ProcessorRef {
        Arc::new(self)
    }
}

impl<P: Processor + 'static> ProcessorExt for P {}
