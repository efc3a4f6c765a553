//! Logging setup for binaries and tests embedding the engine.
//!
//! The engine itself only emits `tracing` events and spans; nothing is
//! printed until a subscriber is installed.

mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};
