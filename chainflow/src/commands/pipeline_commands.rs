//! Commands acting on a pipeline's shared state.

use super::Command;
use crate::core::{Item, ProcessingContext};
use crate::errors::CommandError;
use crate::pipeline::Pipeline;
use crate::state::StateSnapshot;
use crate::utils::{now_utc, Timestamp};
use std::sync::Arc;
use tracing::debug;

/// Runs a batch through a pipeline; undo restores the state it started from.
///
/// Undo only rolls back shared state. Results already handed out, and any
/// effects processors had outside the state, are not reverted.
#[derive(Debug)]
pub struct ExecutePipelineCommand {
    pipeline: Arc<Pipeline>,
    items: Vec<Item>,
    snapshot: Option<StateSnapshot>,
    results: Vec<ProcessingContext>,
    executed_at: Option<Timestamp>,
}

impl ExecutePipelineCommand {
    /// Creates a command that will run `items` through `pipeline`.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>, items: Vec<Item>) -> Self {
        Self {
            pipeline,
            items,
            snapshot: None,
            results: Vec::new(),
            executed_at: None,
        }
    }

    /// Returns the contexts from the last execution.
    #[must_use]
    pub fn results(&self) -> &[ProcessingContext] {
        &self.results
    }
}

impl Command for ExecutePipelineCommand {
    fn name(&self) -> &str {
        "execute_pipeline"
    }

    fn execute(&mut self) -> Result<Vec<ProcessingContext>, CommandError> {
        self.snapshot = Some(self.pipeline.get_state());
        self.results = self.pipeline.execute(self.items.clone());
        self.executed_at = Some(now_utc());
        debug!(
            pipeline_id = %self.pipeline.id(),
            items = self.items.len(),
            "Executed pipeline command"
        );
        Ok(self.results.clone())
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        if self.executed_at.is_none() {
            return Err(CommandError::NotExecuted {
                name: self.name().to_string(),
            });
        }
        if let Some(snapshot) = self.snapshot.take() {
            self.pipeline.set_state(snapshot);
        }
        self.executed_at = None;
        debug!(pipeline_id = %self.pipeline.id(), "Undid pipeline command");
        Ok(())
    }

    fn is_executed(&self) -> bool {
        self.executed_at.is_some()
    }

    fn executed_at(&self) -> Option<Timestamp> {
        self.executed_at
    }
}

/// Empties a pipeline's shared state; undo puts the cleared state back.
#[derive(Debug)]
pub struct ClearStateCommand {
    pipeline: Arc<Pipeline>,
    saved: Option<StateSnapshot>,
    executed_at: Option<Timestamp>,
}

impl ClearStateCommand {
    /// Creates a command that clears `pipeline`'s state.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            saved: None,
            executed_at: None,
        }
    }
}

impl Command for ClearStateCommand {
    fn name(&self) -> &str {
        "clear_state"
    }

    fn execute(&mut self) -> Result<Vec<ProcessingContext>, CommandError> {
        self.saved = Some(self.pipeline.get_state());
        self.pipeline.clear_state();
        self.executed_at = Some(now_utc());
        Ok(Vec::new())
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        if self.executed_at.is_none() {
            return Err(CommandError::NotExecuted {
                name: self.name().to_string(),
            });
        }
        if let Some(saved) = self.saved.take() {
            self.pipeline.set_state(saved);
        }
        self.executed_at = None;
        Ok(())
    }

    fn is_executed(&self) -> bool {
        self.executed_at.is_some()
    }

    fn executed_at(&self) -> Option<Timestamp> {
        self.executed_at
    }
}
