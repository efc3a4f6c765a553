//! Payload transformations.
//!
//! A [`TransformStrategy`] turns one item into a new one; the
//! [`TransformProcessor`] swaps the result into the context. Strategies
//! always work on a clone, so the input item is never mutated in place.

use super::Processor;
use crate::core::{Item, Payload, ProcessingContext, Step};
use crate::errors::ProcessorError;
use crate::state::SharedState;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

/// A pluggable item transformation.
pub trait TransformStrategy: Send + Sync + Debug {
    /// Short name used as the default processor name.
    fn name(&self) -> &str;

    /// Produces the transformed item.
    ///
    /// `state` is the pipeline's shared state; strategies should treat it
    /// as read-only.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessorError`] if the item cannot be transformed.
    fn transform(&self, item: &Item, state: &SharedState) -> Result<Item, ProcessorError>;
}

fn map_strings(item: &Item, f: impl Fn(&str) -> String) -> Item {
    let mut cloned = item.clone();
    for value in cloned.payload.values_mut() {
        if let Value::String(s) = value {
            *s = f(s);
        }
    }
    cloned
}

/// Upper-cases every top-level string value.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpperCaseTransform;

impl TransformStrategy for UpperCaseTransform {
    fn name(&self) -> &str {
        "uppercase"
    }

    fn transform(&self, item: &Item, _state: &SharedState) -> Result<Item, ProcessorError> {
        Ok(map_strings(item, str::to_uppercase))
    }
}

/// Lower-cases every top-level string value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCaseTransform;

impl TransformStrategy for LowerCaseTransform {
    fn name(&self) -> &str {
        "lowercase"
    }

    fn transform(&self, item: &Item, _state: &SharedState) -> Result<Item, ProcessorError> {
        Ok(map_strings(item, str::to_lowercase))
    }
}

/// Keeps only the listed payload fields.
#[derive(Debug, Clone)]
pub struct FilterFieldsTransform {
    fields: HashSet<String>,
}

impl FilterFieldsTransform {
    /// Creates a filter keeping `fields`.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl TransformStrategy for FilterFieldsTransform {
    fn name(&self) -> &str {
        "filter_fields"
    }

    fn transform(&self, item: &Item, _state: &SharedState) -> Result<Item, ProcessorError> {
        let mut cloned = item.clone();
        cloned.payload.retain(|key, _| self.fields.contains(key));
        Ok(cloned)
    }
}

type PayloadFn = dyn Fn(Payload) -> Payload + Send + Sync;

/// Applies a caller-supplied function to the payload.
#[derive(Clone)]
pub struct FnTransform {
    name: String,
    func: Arc<PayloadFn>,
}

impl FnTransform {
    /// Creates a transform from a payload function.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Payload) -> Payload + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl Debug for FnTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTransform").field("name", &self.name).finish()
    }
}

impl TransformStrategy for FnTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, item: &Item, _state: &SharedState) -> Result<Item, ProcessorError> {
        let mut cloned = item.clone();
        cloned.payload = (self.func)(cloned.payload);
        Ok(cloned)
    }
}

/// Replaces the context's item with the output of a strategy.
#[derive(Debug, Clone)]
pub struct TransformProcessor {
    name: String,
    strategy: Arc<dyn TransformStrategy>,
}

impl TransformProcessor {
    /// Creates a processor named after its strategy.
    pub fn new(strategy: impl TransformStrategy + 'static) -> Self {
        let strategy: Arc<dyn TransformStrategy> = Arc::new(strategy);
        Self {
            name: strategy.name().to_string(),
            strategy,
        }
    }

    /// Sets the processor name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Processor for TransformProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let transformed = self
            .strategy
            .transform(&ctx.item, ctx.state())
            .map_err(|mut err| {
                err.processor.clone_from(&self.name);
                err
            })?;
        ctx.item = transformed;
        Ok(Step::Continue)
    }
}
