//! # Chainflow
//!
//! A synchronous, item-oriented processing pipeline engine.
//!
//! Chainflow runs batches of records through an ordered chain of processors
//! with support for:
//!
//! - **Chain-of-responsibility execution**: every processor sees each item in
//!   order and may continue, skip, or fail it
//! - **Composable decorators**: timing, retry with backoff, bounded caching
//!   and logging wrap any processor
//! - **Shared pipeline state**: counters, seen-sets and aggregations persist
//!   across runs until cleared
//! - **Event-driven observability**: lifecycle events fan out to observers,
//!   including a per-pipeline metrics collector
//! - **Undoable runs**: batch executions are commands that can be undone and
//!   redone through a bounded history
//!
//! ## Quick Start
//!
//! ```rust
//! use chainflow::prelude::*;
//! use std::sync::Arc;
//!
//! let bus = Arc::new(EventBus::new());
//! let metrics = Arc::new(MetricsCollector::new());
//! bus.subscribe(metrics.clone());
//!
//! let pipeline = PipelineBuilder::new("orders")
//!     .processor(DeduplicationProcessor::default())
//!     .processor(CounterProcessor::default().timed())
//!     .with_event_bus(bus)
//!     .build()?;
//!
//! let contexts = pipeline.execute(vec![
//!     Item::with_id("a", Payload::new()),
//!     Item::with_id("a", Payload::new()),
//! ]);
//!
//! assert!(contexts[0].is_success());
//! assert!(contexts[1].is_skipped());
//! assert_eq!(metrics.get_metrics("orders").map(|m| m.total_items), Some(2));
//! # Ok::<(), chainflow::errors::ConfigurationError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod commands;
pub mod core;
pub mod decorators;
pub mod errors;
pub mod events;
pub mod io;
pub mod observability;
pub mod pipeline;
pub mod processors;
pub mod state;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::commands::{
        ClearStateCommand, Command, CommandHistory, ExecutePipelineCommand,
    };
    pub use crate::core::{
        EventType, Item, Payload, PipelineEvent, ProcessingContext, ProcessingResult, Step,
    };
    pub use crate::decorators::{
        CacheConfig, CachingDecorator, EvictionPolicy, LoggingDecorator, LoggingDecoratorConfig,
        ProcessorExt, RetryConfig, RetryDecorator, TimingDecorator,
    };
    pub use crate::errors::{
        ChainflowError, CommandError, ConfigurationError, HistoryError, ObserverError,
        ProcessorError, ProcessorErrorKind,
    };
    pub use crate::events::{
        CollectingObserver, EventBus, FileFormat, FileObserver, LoggingObserver, MetricsCollector,
        Observer, PipelineMetrics,
    };
    pub use crate::io::{Adapter, CsvAdapter, JsonAdapter, Sink, Source};
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, PipelineConfig, ProcessorRegistry, ProcessorSpec,
    };
    pub use crate::processors::{
        AggregatorProcessor, CounterProcessor, DeduplicationProcessor, FnProcessor, Processor,
        ProcessorRef, TransformProcessor, ValidationProcessor,
    };
    pub use crate::state::SharedState;
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
