//! Pipeline building and execution.
//!
//! This module provides:
//! - The [`Pipeline`] executor and its [`PipelineConfig`]
//! - A fluent [`PipelineBuilder`]
//! - A config-driven [`ProcessorRegistry`]

mod builder;
mod config;
mod executor;
#[cfg(test)]
mod integration_tests;
mod registry;

pub use builder::PipelineBuilder;
pub use config::PipelineConfig;
pub use executor::{BatchSummary, Pipeline};
pub use registry::{
    parse_options, DecoratorSpec, ProcessorFactory, ProcessorRegistry, ProcessorSpec,
};
