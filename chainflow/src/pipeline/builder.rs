//! Pipeline builder.

use super::{Pipeline, PipelineConfig, ProcessorRegistry, ProcessorSpec};
use crate::errors::ConfigurationError;
use crate::events::EventBus;
use crate::processors::{Processor, ProcessorRef};
use crate::state::{SharedState, StateMap};
use std::sync::Arc;

/// Fluent builder for [`Pipeline`]s.
///
/// ```
/// use chainflow::pipeline::PipelineBuilder;
/// use chainflow::processors::CounterProcessor;
///
/// let pipeline = PipelineBuilder::new("orders")
///     .processor(CounterProcessor::default())
///     .build()
///     .unwrap();
/// assert_eq!(pipeline.processor_names(), vec!["counter"]);
/// ```
#[derive(Debug)]
pub struct PipelineBuilder {
    id: String,
    processors: Vec<ProcessorRef>,
    state: Option<SharedState>,
    event_bus: Option<Arc<EventBus>>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Creates a builder for a pipeline with `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            processors: Vec::new(),
            state: None,
            event_bus: None,
            config: PipelineConfig::default(),
        }
    }

    /// Appends a processor to the chain.
    #[must_use]
    pub fn processor(self, processor: impl Processor + 'static) -> Self {
        self.processor_ref(Arc::new(processor))
    }

    /// Appends a shared processor to the chain.
    #[must_use]
    pub fn processor_ref(mut self, processor: ProcessorRef) -> Self {
        self.processors.push(processor);
        self
    }

    /// Appends several shared processors, in order.
    #[must_use]
    pub fn processors(mut self, processors: impl IntoIterator<Item = ProcessorRef>) -> Self {
        self.processors.extend(processors);
        self
    }

    /// Appends processors built from specs.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for unknown kinds or bad options.
    pub fn from_specs(
        self,
        registry: &ProcessorRegistry,
        specs: &[ProcessorSpec],
    ) -> Result<Self, ConfigurationError> {
        Ok(self.processors(registry.build_all(specs)?))
    }

    /// Uses an existing shared state instance.
    #[must_use]
    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = Some(state);
        self
    }

    /// Seeds a fresh shared state with `initial`.
    #[must_use]
    pub fn with_initial_state(self, initial: StateMap) -> Self {
        self.with_state(SharedState::from_map(initial))
    }

    /// Publishes lifecycle events to `bus`.
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Sets the execution configuration.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the number of processors added so far.
    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if no processors were added.
    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        if self.processors.is_empty() {
            return Err(ConfigurationError::empty_pipeline(&self.id));
        }

        Ok(Pipeline::from_parts(
            self.id,
            self.processors,
            self.state.unwrap_or_default(),
            self.event_bus,
            self.config,
        ))
    }
}
