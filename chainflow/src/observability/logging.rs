//! `tracing-subscriber` installation.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset or ignored.
    pub default_directive: String,
    /// Whether `RUST_LOG` overrides `default_directive`.
    pub use_env: bool,
    /// Whether event targets are printed.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            default_directive: "chainflow=info".to_string(),
            use_env: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the fallback filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Ignores `RUST_LOG` when false.
    #[must_use]
    pub fn with_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    fn filter(&self) -> Result<EnvFilter, ConfigurationError> {
        if self.use_env {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        EnvFilter::try_new(&self.default_directive)
            .map_err(|err| ConfigurationError::invalid_options("logging", err.to_string()))
    }
}

/// Installs a global `tracing` subscriber.
///
/// Returns `Ok(false)` without changing anything if a global subscriber is
/// already installed, so calling this more than once is harmless.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if the filter directive does not parse.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigurationError> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    Ok(result.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.default_directive, "chainflow=info");
        assert!(config.use_env);
    }

    #[test]
    fn test_config_from_json() {
        let config: LoggingConfig =
            serde_json::from_str(r#"{"format": "json", "default_directive": "debug"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.default_directive, "debug");
        assert!(config.with_target);
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        let config = LoggingConfig::default()
            .with_env(false)
            .with_directive("chainflow=verbose");
        let err = init_logging(&config).unwrap_err();
        assert_eq!(err.info.code, "CONFIG-003-INVALID_OPTIONS");
    }

    #[test]
    fn test_repeated_install_is_harmless() {
        let config = LoggingConfig::default()
            .with_env(false)
            .with_directive("warn");
        init_logging(&config).unwrap();
        assert!(!init_logging(&config).unwrap());
    }
}
