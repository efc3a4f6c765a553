//! Event bus and observers for pipeline observability.
//!
//! Pipelines publish [`PipelineEvent`](crate::core::PipelineEvent)s to an
//! explicitly constructed [`EventBus`]; there is no global bus. Observers
//! receive events synchronously and cannot disturb the publisher.

mod bus;
mod metrics;
mod observers;

pub use bus::{EventBus, Observer};
pub(crate) use bus::panic_message;
pub use metrics::{MetricsCollector, PipelineMetrics};
pub use observers::{CollectingObserver, FileFormat, FileObserver, LoggingObserver};
