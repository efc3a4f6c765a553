//! Per-item processing context.

use super::{Item, ProcessingResult};
use crate::errors::ProcessorError;
use crate::state::SharedState;

/// Mutable envelope around one item while it travels the processor chain.
///
/// `state` is a handle to the pipeline's shared state, not a copy: every
/// context created by one pipeline sees the same map.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    /// The item being processed.
    pub item: Item,
    /// Outcome of the traversal so far.
    pub result: ProcessingResult,
    /// The error that failed the item, if any.
    pub error: Option<ProcessorError>,
    /// Why the item was skipped, if it was.
    pub skip_reason: Option<String>,
    /// Names of the processors that touched the item, in order.
    pub history: Vec<String>,
    state: SharedState,
}

impl ProcessingContext {
    /// Creates a pending context for `item` bound to `state`.
    #[must_use]
    pub fn new(item: Item, state: SharedState) -> Self {
        Self {
            item,
            result: ProcessingResult::Pending,
            error: None,
            skip_reason: None,
            history: Vec::new(),
            state,
        }
    }

    /// Returns the shared state handle.
    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Returns the item id.
    #[must_use]
    pub fn item_id(&self) -> &str {
        &self.item.id
    }

    /// Appends a processor name to the history.
    pub fn record(&mut self, processor_name: impl Into<String>) {
        self.history.push(processor_name.into());
    }

    /// Marks the context successful.
    pub fn mark_success(&mut self) {
        self.result = ProcessingResult::Success;
        self.error = None;
    }

    /// Marks the context failed with `error`.
    pub fn mark_failure(&mut self, error: ProcessorError) {
        self.result = ProcessingResult::Failure;
        self.error = Some(error);
    }

    /// Marks the context skipped.
    pub fn mark_skipped(&mut self, reason: impl Into<String>) {
        self.result = ProcessingResult::Skipped;
        self.skip_reason = Some(reason.into());
    }

    /// Returns true if processing succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == ProcessingResult::Success
    }

    /// Returns true if processing failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.result == ProcessingResult::Failure
    }

    /// Returns true if the item was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.result == ProcessingResult::Skipped
    }
}
