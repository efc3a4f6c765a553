//! Core domain model types for chainflow.
//!
//! This module contains the values that flow through a pipeline:
//! - [`Item`], the unit of data
//! - [`ProcessingContext`], the per-item envelope with outcome bookkeeping
//! - [`ProcessingResult`] and [`Step`], the explicit tri-state outcome
//! - [`PipelineEvent`], the lifecycle event value

mod context;
#[cfg(test)]
mod context_tests;
mod event;
mod item;
mod status;

pub use context::ProcessingContext;
pub use event::{EventType, PipelineEvent};
pub use item::{Item, Payload};
pub use status::{ProcessingResult, Step};
