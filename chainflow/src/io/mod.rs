//! Item sources, result sinks, and record adapters for memory, JSON lines
//! and CSV.

mod adapter;
mod sink;
mod source;

pub use adapter::{Adapter, CsvAdapter, IdentityAdapter, JsonAdapter};
pub use sink::{CsvSink, JsonLinesSink, MemorySink, Sink};
pub use source::{CsvSource, JsonLinesSource, MemorySource, Source};
