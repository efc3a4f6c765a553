//! Undoable operations and their history.
//!
//! Commands capture a snapshot of pipeline state before they act, so
//! undoing one restores state without re-processing anything.

mod history;
mod pipeline_commands;

pub use history::{CommandHistory, HistoryConfig};
pub use pipeline_commands::{ClearStateCommand, ExecutePipelineCommand};

use crate::core::ProcessingContext;
use crate::errors::CommandError;
use crate::utils::Timestamp;
use std::fmt::Debug;

/// An undoable operation.
pub trait Command: Send + Debug {
    /// Returns a short name for logging and error messages.
    fn name(&self) -> &str;

    /// Performs the operation. Executing again after an undo repeats it.
    ///
    /// Returns the contexts produced, if the command runs a pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] if the operation cannot be performed.
    fn execute(&mut self) -> Result<Vec<ProcessingContext>, CommandError>;

    /// Reverts the effects of the last [`Command::execute`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotExecuted`] if the command has not been
    /// executed since it was created or last undone.
    fn undo(&mut self) -> Result<(), CommandError>;

    /// Returns true if the command is currently applied.
    fn is_executed(&self) -> bool;

    /// Returns when the command was last executed, if it is applied.
    fn executed_at(&self) -> Option<Timestamp>;
}
