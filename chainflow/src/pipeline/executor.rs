//! Batch execution of a processor chain.

use super::{PipelineBuilder, PipelineConfig};
use crate::core::{EventType, Item, PipelineEvent, ProcessingContext, ProcessingResult, Step};
use crate::errors::{ChainflowError, ProcessorError};
use crate::events::{panic_message, EventBus};
use crate::io::{Sink, Source};
use crate::processors::{Processor, ProcessorRef};
use crate::state::{SharedState, StateSnapshot};
use crate::utils::duration_ms;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items that succeeded.
    pub successful: usize,
    /// Items that failed.
    pub failed: usize,
    /// Items that were skipped.
    pub skipped: usize,
}

impl BatchSummary {
    /// Tallies the outcomes of `contexts`.
    #[must_use]
    pub fn from_contexts(contexts: &[ProcessingContext]) -> Self {
        let mut summary = Self::default();
        for ctx in contexts {
            summary.record(ctx.result);
        }
        summary
    }

    fn record(&mut self, result: ProcessingResult) {
        match result {
            ProcessingResult::Success => self.successful += 1,
            ProcessingResult::Failure => self.failed += 1,
            ProcessingResult::Skipped => self.skipped += 1,
            ProcessingResult::Pending => {}
        }
    }

    /// Total number of finished items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.successful + self.failed + self.skipped
    }
}

/// An ordered chain of processors plus the state they share.
///
/// State persists across calls to [`Pipeline::execute`] until
/// [`Pipeline::clear_state`]. A pipeline is `Send + Sync`; concurrent runs
/// share the same state and must rely on [`SharedState::update`] for
/// read-modify-write sequences.
#[derive(Debug)]
pub struct Pipeline {
    id: String,
    processors: Vec<ProcessorRef>,
    state: SharedState,
    event_bus: Option<Arc<EventBus>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub(super) fn from_parts(
        id: String,
        processors: Vec<ProcessorRef>,
        state: SharedState,
        event_bus: Option<Arc<EventBus>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            id,
            processors,
            state,
            event_bus,
            config,
        }
    }

    /// Starts building a pipeline.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(id)
    }

    /// Returns the pipeline id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the processor names, in chain order.
    #[must_use]
    pub fn processor_names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Returns the number of processors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Always false; a pipeline cannot be built without processors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the event bus, if one is attached.
    #[must_use]
    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    /// Returns the live shared state handle.
    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Returns a deep copy of the shared state.
    #[must_use]
    pub fn get_state(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Replaces the shared state's contents. Existing handles stay valid.
    pub fn set_state(&self, snapshot: StateSnapshot) {
        self.state.restore(snapshot);
    }

    /// Empties the shared state.
    pub fn clear_state(&self) {
        self.state.clear();
    }

    /// Runs every item through the full chain, in input order.
    ///
    /// Returns one context per input item, in the same order. Item failures
    /// are recorded on their context and never stop the batch.
    pub fn execute(&self, items: Vec<Item>) -> Vec<ProcessingContext> {
        let span = info_span!("pipeline_run", pipeline_id = %self.id, batch_size = items.len());
        let _guard = span.enter();

        let started = Instant::now();
        self.publish(|| PipelineEvent::pipeline_started(&self.id, items.len()));

        let mut summary = BatchSummary::default();
        let mut contexts = Vec::with_capacity(items.len());
        for item in items {
            let ctx = self.execute_single(item);
            summary.record(ctx.result);
            contexts.push(ctx);
        }

        let elapsed = duration_ms(started.elapsed());
        let event_type = if summary.failed > 0 {
            EventType::PipelineFailed
        } else {
            EventType::PipelineCompleted
        };
        self.publish(|| {
            PipelineEvent::new(event_type, &self.id)
                .add_metadata("total", serde_json::json!(summary.total()))
                .add_metadata("successful", serde_json::json!(summary.successful))
                .add_metadata("failed", serde_json::json!(summary.failed))
                .add_metadata("skipped", serde_json::json!(summary.skipped))
                .add_metadata("duration_ms", serde_json::json!(elapsed))
        });

        info!(
            total = summary.total(),
            successful = summary.successful,
            failed = summary.failed,
            skipped = summary.skipped,
            duration_ms = elapsed,
            "Pipeline run finished"
        );
        contexts
    }

    /// Runs one item through the full chain.
    ///
    /// Publishes item events only; no pipeline-level events are emitted.
    pub fn execute_single(&self, item: Item) -> ProcessingContext {
        let mut ctx = ProcessingContext::new(item, self.state.clone());
        if self.config.emit_item_events {
            self.publish(|| PipelineEvent::item_started(&self.id, ctx.item_id()));
        }

        for processor in &self.processors {
            ctx.record(processor.name());
            match self.invoke(processor, &mut ctx) {
                Ok(Step::Continue) => {}
                Ok(Step::Skip { reason }) => {
                    debug!(
                        item_id = %ctx.item.id,
                        processor = processor.name(),
                        reason = %reason,
                        "Item skipped"
                    );
                    ctx.mark_skipped(reason);
                    break;
                }
                Err(err) => {
                    debug!(
                        item_id = %ctx.item.id,
                        processor = processor.name(),
                        error = %err,
                        "Item failed"
                    );
                    ctx.mark_failure(err);
                    break;
                }
            }
        }

        if ctx.result == ProcessingResult::Pending {
            ctx.mark_success();
        }

        if self.config.emit_item_events {
            self.publish(|| self.item_finished_event(&ctx));
        }
        ctx
    }

    /// Reads every item from `source`, closes it, and runs the batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or closed.
    pub fn execute_from_source(
        &self,
        source: &mut dyn Source,
    ) -> Result<Vec<ProcessingContext>, ChainflowError> {
        let items = source.read();
        let closed = source.close();
        let items = items?;
        closed?;
        Ok(self.execute(items))
    }

    /// Runs the batch, writes every context to `sink`, and closes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be written or closed.
    pub fn execute_to_sink(
        &self,
        items: Vec<Item>,
        sink: &mut dyn Sink,
    ) -> Result<Vec<ProcessingContext>, ChainflowError> {
        let contexts = self.execute(items);
        let written = sink.write(&contexts);
        let closed = sink.close();
        written?;
        closed?;
        Ok(contexts)
    }

    /// Reads from `source`, runs the batch, and writes to `sink`, closing
    /// both.
    ///
    /// # Errors
    ///
    /// Returns the first source or sink error.
    pub fn execute_source_to_sink(
        &self,
        source: &mut dyn Source,
        sink: &mut dyn Sink,
    ) -> Result<Vec<ProcessingContext>, ChainflowError> {
        match self.execute_from_source(source) {
            Ok(contexts) => {
                let written = sink.write(&contexts);
                let closed = sink.close();
                written?;
                closed?;
                Ok(contexts)
            }
            Err(err) => {
                sink.close()?;
                Err(err)
            }
        }
    }

    fn invoke(
        &self,
        processor: &ProcessorRef,
        ctx: &mut ProcessingContext,
    ) -> Result<Step, ProcessorError> {
        if !self.config.catch_panics {
            return processor.process(ctx);
        }
        catch_unwind(AssertUnwindSafe(|| processor.process(ctx))).unwrap_or_else(|panic| {
            Err(ProcessorError::internal(
                processor.name(),
                format!("panicked: {}", panic_message(panic.as_ref())),
            ))
        })
    }

    fn item_finished_event(&self, ctx: &ProcessingContext) -> PipelineEvent {
        match ctx.result {
            ProcessingResult::Failure => {
                let processor = ctx.history.last().map_or("", String::as_str);
                let error = ctx.error.as_ref().map(ToString::to_string).unwrap_or_default();
                PipelineEvent::item_failed(&self.id, ctx.item_id(), processor, &error)
            }
            ProcessingResult::Skipped => {
                let mut event = PipelineEvent::item_completed(&self.id, ctx.item_id(), "skipped");
                if let Some(reason) = &ctx.skip_reason {
                    event = event.add_metadata("skip_reason", serde_json::json!(reason));
                }
                event
            }
            ProcessingResult::Success | ProcessingResult::Pending => {
                PipelineEvent::item_completed(&self.id, ctx.item_id(), "success")
            }
        }
    }

    fn publish(&self, event: impl FnOnce() -> PipelineEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(&event());
        }
    }
}
