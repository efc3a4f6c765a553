//! Error types for the chainflow engine.
//!
//! Only configuration mistakes and undo/redo misuse are exceptional control
//! paths for callers. Per-item processing errors are recorded on the
//! [`ProcessingContext`](crate::core::ProcessingContext) and never abort a
//! batch; observer errors are swallowed at the event bus.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for chainflow operations.
#[derive(Debug, Error)]
pub enum ChainflowError {
    /// The pipeline or one of its parts was configured incorrectly.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Undo or redo was requested at a history boundary.
    #[error("{0}")]
    History(#[from] HistoryError),

    /// A command was used out of order.
    #[error("{0}")]
    Command(#[from] CommandError),

    /// A source failed to produce items.
    #[error("{0}")]
    Source(#[from] SourceError),

    /// A sink failed to record results.
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic details attached to a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-001-EMPTY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl ErrorInfo {
    /// Creates new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        map
    }
}

/// Error raised when a pipeline cannot be assembled.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// Structured diagnostics.
    pub info: ErrorInfo,
}

impl ConfigurationError {
    /// Creates a configuration error with explicit diagnostics.
    #[must_use]
    pub fn new(message: impl Into<String>, info: ErrorInfo) -> Self {
        Self {
            message: message.into(),
            info,
        }
    }

    /// The pipeline was built without any processors.
    #[must_use]
    pub fn empty_pipeline(pipeline_id: &str) -> Self {
        Self::new(
            format!("Pipeline '{pipeline_id}' must have at least one processor"),
            ErrorInfo::new("CONFIG-001-EMPTY", "Cannot build an empty pipeline")
                .with_fix_hint("Add at least one processor before calling build()."),
        )
    }

    /// A processor spec named a kind the registry does not know.
    #[must_use]
    pub fn unknown_kind(kind: &str) -> Self {
        Self::new(
            format!("Unknown processor kind '{kind}'"),
            ErrorInfo::new("CONFIG-002-UNKNOWN_KIND", format!("No factory registered for '{kind}'"))
                .with_fix_hint("Register the kind on the ProcessorRegistry or fix the spelling."),
        )
    }

    /// Options for a processor or decorator could not be interpreted.
    #[must_use]
    pub fn invalid_options(target: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            format!("Invalid options for '{target}': {reason}"),
            ErrorInfo::new("CONFIG-003-INVALID_OPTIONS", reason),
        )
    }
}

/// Classification of a processing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorErrorKind {
    /// A failure that may succeed when attempted again.
    Transient,
    /// The item does not satisfy a processor's requirements.
    Validation,
    /// Any other unexpected fault.
    Internal,
}

impl std::fmt::Display for ProcessorErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Validation => write!(f, "validation"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// An unexpected fault raised by a processor for one item.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Processor '{processor}' failed ({kind}): {message}")]
pub struct ProcessorError {
    /// Name of the processor that raised the error.
    pub processor: String,
    /// The failure classification.
    pub kind: ProcessorErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ProcessorError {
    /// Creates a new processor error.
    #[must_use]
    pub fn new(
        processor: impl Into<String>,
        kind: ProcessorErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            processor: processor.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a transient error.
    #[must_use]
    pub fn transient(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(processor, ProcessorErrorKind::Transient, message)
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(processor, ProcessorErrorKind::Validation, message)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(processor, ProcessorErrorKind::Internal, message)
    }

    /// Returns true for transient failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == ProcessorErrorKind::Transient
    }
}

impl From<anyhow::Error> for ProcessorError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("anonymous", format!("{err:#}"))
    }
}

/// Error returned by an observer's event handler.
#[derive(Debug, Clone, Error)]
#[error("Observer error: {0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    /// Creates a new observer error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Misuse of the command history at its boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// No executed command is left to undo.
    #[error("Nothing to undo")]
    NothingToUndo,
    /// No undone command is left to redo.
    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Errors raised by individual commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// `undo` was called on a command that has not been executed.
    #[error("Command '{name}' cannot be undone before it is executed")]
    NotExecuted {
        /// The command name.
        name: String,
    },
}

/// Errors raised by item sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source was read after `close()`.
    #[error("Cannot read from closed source '{0}'")]
    Closed(String),

    /// A raw record could not be turned into an item.
    #[error("Malformed record at {location}: {reason}")]
    Malformed {
        /// Where the record was found (e.g. "line 3").
        location: String,
        /// Why it was rejected.
        reason: String,
    },

    /// CSV decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by result sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink was written after `close()`.
    #[error("Cannot write to closed sink '{0}'")]
    Closed(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV encoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
