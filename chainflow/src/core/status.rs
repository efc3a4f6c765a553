//! Processing outcome enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome recorded on a processing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingResult {
    /// The context has not finished its traversal.
    #[default]
    Pending,
    /// Every processor accepted the item.
    Success,
    /// A processor raised an error.
    Failure,
    /// A processor asked to stop the chain for this item.
    Skipped,
}

impl fmt::Display for ProcessingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl ProcessingResult {
    /// Returns true if the context reached a final outcome.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What a processor asks the chain to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Hand the context to the next processor.
    Continue,
    /// Stop the chain for this item and mark it skipped.
    Skip {
        /// Why the item was skipped.
        reason: String,
    },
}

impl Step {
    /// Creates a skip step.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    /// Returns true for [`Step::Skip`].
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}
