//! Field validation.

use super::Processor;
use crate::core::{ProcessingContext, Step};
use crate::errors::{ConfigurationError, ProcessorError};
use regex::Regex;
use serde_json::Value;

/// Rejects items missing required fields or whose string fields do not
/// match a pattern.
///
/// A violation is reported as a validation error, which the pipeline
/// records as a failure for that item.
#[derive(Debug, Clone)]
pub struct ValidationProcessor {
    name: String,
    required: Vec<String>,
    patterns: Vec<(String, Regex)>,
}

impl ValidationProcessor {
    /// Creates a validator with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "validate".to_string(),
            required: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Sets the processor name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Requires `field` to be present and non-null.
    #[must_use]
    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    /// Requires `field`, when present, to be a string matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if `pattern` is not a valid regex.
    pub fn pattern(
        mut self,
        field: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, ConfigurationError> {
        let field = field.into();
        let regex = Regex::new(pattern).map_err(|err| {
            ConfigurationError::invalid_options(&self.name, format!("field '{field}': {err}"))
        })?;
        self.patterns.push((field, regex));
        Ok(self)
    }

    fn check(&self, ctx: &ProcessingContext) -> Result<(), String> {
        for field in &self.required {
            match ctx.item.payload_value(field) {
                None | Some(Value::Null) => return Err(format!("missing required field '{field}'")),
                Some(_) => {}
            }
        }

        for (field, regex) in &self.patterns {
            match ctx.item.payload_value(field) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) if regex.is_match(s) => {}
                Some(Value::String(s)) => {
                    return Err(format!(
                        "field '{field}' value '{s}' does not match /{}/",
                        regex.as_str()
                    ))
                }
                Some(_) => return Err(format!("field '{field}' is not a string")),
            }
        }

        Ok(())
    }
}

impl Default for ValidationProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ValidationProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        self.check(ctx)
            .map(|()| Step::Continue)
            .map_err(|message| ProcessorError::validation(&self.name, message))
    }
}
