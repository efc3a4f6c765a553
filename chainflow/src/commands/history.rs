//! Linear undo/redo history.

use super::Command;
use crate::core::ProcessingContext;
use crate::errors::{ChainflowError, HistoryError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for a [`CommandHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of commands retained; the oldest are dropped first.
    pub max_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

/// An ordered list of executed commands with a cursor.
///
/// Everything at or before the cursor is applied; everything after it has
/// been undone and can be redone. Executing a new command discards the
/// redoable tail.
#[derive(Debug, Default)]
pub struct CommandHistory {
    commands: Vec<Box<dyn Command>>,
    cursor: Option<usize>,
    config: HistoryConfig,
}

impl CommandHistory {
    /// Creates an empty history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty history with the given configuration.
    #[must_use]
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            commands: Vec::new(),
            cursor: None,
            config,
        }
    }

    /// Executes `command` and records it.
    ///
    /// A command that fails to execute is not recorded.
    ///
    /// # Errors
    ///
    /// Returns the command's error if it fails.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
    ) -> Result<Vec<ProcessingContext>, ChainflowError> {
        let output = command.execute()?;
        debug!(command = command.name(), "Executed command");

        let keep = self.cursor.map_or(0, |c| c + 1);
        self.commands.truncate(keep);
        self.commands.push(command);

        if self.commands.len() > self.config.max_history {
            let excess = self.commands.len() - self.config.max_history;
            self.commands.drain(..excess);
        }
        self.cursor = self.commands.len().checked_sub(1);
        Ok(output)
    }

    /// Undoes the command at the cursor and moves the cursor back.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NothingToUndo`] when no command is applied,
    /// or the command's own error if its undo fails. The cursor does not
    /// move on failure.
    pub fn undo(&mut self) -> Result<(), ChainflowError> {
        let cursor = self.cursor.ok_or(HistoryError::NothingToUndo)?;
        let command = self
            .commands
            .get_mut(cursor)
            .ok_or(HistoryError::NothingToUndo)?;
        if let Err(err) = command.undo() {
            warn!(command = command.name(), error = %err, "Undo failed");
            return Err(err.into());
        }
        debug!(command = command.name(), "Undid command");
        self.cursor = cursor.checked_sub(1);
        Ok(())
    }

    /// Re-executes the command after the cursor and moves the cursor forward.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NothingToRedo`] when nothing has been undone,
    /// or the command's own error if it fails to execute again.
    pub fn redo(&mut self) -> Result<Vec<ProcessingContext>, ChainflowError> {
        let next = self.cursor.map_or(0, |c| c + 1);
        let command = self
            .commands
            .get_mut(next)
            .ok_or(HistoryError::NothingToRedo)?;
        let output = command.execute()?;
        debug!(command = command.name(), "Redid command");
        self.cursor = Some(next);
        Ok(output)
    }

    /// Returns true if at least one command is applied.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Returns true if at least one undone command can be redone.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.commands.len()
    }

    /// Drops every recorded command without undoing anything.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = None;
    }

    /// Returns the index of the last applied command.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Returns the number of recorded commands, applied or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns the names of the recorded commands, oldest first.
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> HistoryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CommandError;
    use crate::utils::{now_utc, Timestamp};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Appends its label to a shared log on execute, removes it on undo.
    #[derive(Debug)]
    struct PushCommand {
        label: String,
        log: Arc<Mutex<Vec<String>>>,
        executed_at: Option<Timestamp>,
    }

    impl PushCommand {
        fn boxed(label: &str, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Command> {
            Box::new(Self {
                label: label.to_string(),
                log: Arc::clone(log),
                executed_at: None,
            })
        }
    }

    impl Command for PushCommand {
        fn name(&self) -> &str {
            &self.label
        }

        fn execute(&mut self) -> Result<Vec<ProcessingContext>, CommandError> {
            self.log.lock().push(self.label.clone());
            self.executed_at = Some(now_utc());
            Ok(Vec::new())
        }

        fn undo(&mut self) -> Result<(), CommandError> {
            if self.executed_at.take().is_none() {
                return Err(CommandError::NotExecuted {
                    name: self.label.clone(),
                });
            }
            self.log.lock().pop();
            Ok(())
        }

        fn is_executed(&self) -> bool {
            self.executed_at.is_some()
        }

        fn executed_at(&self) -> Option<Timestamp> {
            self.executed_at
        }
    }

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_empty_history_boundaries() {
        let mut history = CommandHistory::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(matches!(
            history.undo(),
            Err(ChainflowError::History(HistoryError::NothingToUndo))
        ));
        assert!(matches!(
            history.redo(),
            Err(ChainflowError::History(HistoryError::NothingToRedo))
        ));
    }

    #[test]
    fn test_undo_redo_walks_cursor() {
        let log = log();
        let mut history = CommandHistory::new();
        history.execute(PushCommand::boxed("a", &log)).unwrap();
        history.execute(PushCommand::boxed("b", &log)).unwrap();
        assert_eq!(history.cursor(), Some(1));

        history.undo().unwrap();
        assert_eq!(*log.lock(), vec!["a"]);
        assert_eq!(history.cursor(), Some(0));
        assert!(history.can_redo());

        history.undo().unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(history.cursor(), None);
        assert!(!history.can_undo());

        history.redo().unwrap();
        history.redo().unwrap();
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_execute_discards_redo_tail() {
        let log = log();
        let mut history = CommandHistory::new();
        history.execute(PushCommand::boxed("a", &log)).unwrap();
        history.execute(PushCommand::boxed("b", &log)).unwrap();
        history.undo().unwrap();

        history.execute(PushCommand::boxed("c", &log)).unwrap();
        assert_eq!(history.command_names(), vec!["a", "c"]);
        assert!(!history.can_redo());
        assert_eq!(*log.lock(), vec!["a", "c"]);
    }

    #[test]
    fn test_max_history_drops_oldest() {
        let log = log();
        let mut history = CommandHistory::with_config(HistoryConfig { max_history: 2 });
        for label in ["a", "b", "c"] {
            history.execute(PushCommand::boxed(label, &log)).unwrap();
        }

        assert_eq!(history.len(), 2);
        assert_eq!(history.command_names(), vec!["b", "c"]);
        assert_eq!(history.cursor(), Some(1));

        history.undo().unwrap();
        history.undo().unwrap();
        assert!(history.undo().is_err());
        assert_eq!(*log.lock(), vec!["a"]);
    }

    #[test]
    fn test_clear() {
        let log = log();
        let mut history = CommandHistory::new();
        history.execute(PushCommand::boxed("a", &log)).unwrap();
        history.clear();

        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert_eq!(*log.lock(), vec!["a"]);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(CommandHistory::new().config().max_history, 100);
    }
}
