//! Result sinks.

use super::{Adapter, CsvAdapter, JsonAdapter};
use crate::core::ProcessingContext;
use crate::errors::SinkError;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Receives processed contexts.
///
/// Failed contexts are written like any other, carrying their error.
/// Closing is idempotent; writing to a closed sink is an error.
pub trait Sink: Send {
    /// Writes one context.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink is closed or the write fails.
    fn write_single(&mut self, ctx: &ProcessingContext) -> Result<(), SinkError>;

    /// Writes a batch of contexts, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Sink::write_single`].
    fn write(&mut self, contexts: &[ProcessingContext]) -> Result<(), SinkError> {
        contexts.iter().try_for_each(|ctx| self.write_single(ctx))
    }

    /// Flushes and releases the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered output cannot be flushed.
    fn close(&mut self) -> Result<(), SinkError>;

    /// Returns true once [`Sink::close`] has been called.
    fn is_closed(&self) -> bool;
}

/// Keeps written contexts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    results: Vec<ProcessingContext>,
    closed: bool,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the written contexts.
    #[must_use]
    pub fn results(&self) -> &[ProcessingContext] {
        &self.results
    }

    /// Consumes the sink, returning the written contexts.
    #[must_use]
    pub fn into_results(self) -> Vec<ProcessingContext> {
        self.results
    }
}

impl Sink for MemorySink {
    fn write_single(&mut self, ctx: &ProcessingContext) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed("MemorySink".to_string()));
        }
        self.results.push(ctx.clone());
        Ok(())
    }

    fn write(&mut self, contexts: &[ProcessingContext]) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed("MemorySink".to_string()));
        }
        self.results.extend_from_slice(contexts);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Writes one JSON record per line to a file.
///
/// Output is buffered and flushed on [`Sink::close`]. Parent directories
/// are created as needed.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    adapter: Arc<dyn Adapter>,
    writer: Option<BufWriter<File>>,
    written: usize,
}

impl JsonLinesSink {
    /// Creates (or truncates) `path` using a [`JsonAdapter`] that includes
    /// processing info.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Self::with_adapter(path, Arc::new(JsonAdapter::new().with_processing_info(true)))
    }

    /// Creates (or truncates) `path` using `adapter`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be created.
    pub fn with_adapter(
        path: impl AsRef<Path>,
        adapter: Arc<dyn Adapter>,
    ) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            adapter,
            writer: Some(BufWriter::new(file)),
            written: 0,
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of records written.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }
}

impl Sink for JsonLinesSink {
    fn write_single(&mut self, ctx: &ProcessingContext) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(SinkError::Closed("JsonLinesSink".to_string()));
        };
        let record = self.adapter.from_context(ctx);
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

/// Writes contexts as rows of a CSV file.
///
/// The header is fixed by the first write: the sorted union of the column
/// names in that batch. Later rows leave missing columns empty and drop
/// columns the header lacks. String cells are written as-is, `null` as an
/// empty cell, and any other value as compact JSON.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    adapter: Arc<dyn Adapter>,
    writer: Option<csv::Writer<File>>,
    header: Option<Vec<String>>,
    write_header: bool,
    written: usize,
}

impl CsvSink {
    /// Creates (or truncates) `path` using the default [`CsvAdapter`].
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Self::with_adapter(path, Arc::new(CsvAdapter::default()))
    }

    /// Creates (or truncates) `path` using `adapter`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be created.
    pub fn with_adapter(
        path: impl AsRef<Path>,
        adapter: Arc<dyn Adapter>,
    ) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            adapter,
            writer: Some(csv::Writer::from_writer(file)),
            header: None,
            write_header: true,
            written: 0,
        })
    }

    /// Controls whether the header line is written.
    #[must_use]
    pub fn with_header(mut self, enabled: bool) -> Self {
        self.write_header = enabled;
        self
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the header, once the first row has fixed it.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Returns the number of rows written.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    fn to_row(&self, ctx: &ProcessingContext) -> Map<String, Value> {
        match self.adapter.from_context(ctx) {
            Value::Object(row) => row,
            other => {
                let mut row = Map::new();
                row.insert("value".to_string(), other);
                row
            }
        }
    }

    fn write_rows(&mut self, rows: &[Map<String, Value>]) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(SinkError::Closed("CsvSink".to_string()));
        };

        if self.header.is_none() {
            let columns: BTreeSet<&String> = rows.iter().flat_map(Map::keys).collect();
            let header: Vec<String> = columns.into_iter().cloned().collect();
            if self.write_header {
                writer.write_record(&header)?;
            }
            self.header = Some(header);
        }

        let header = self.header.as_deref().unwrap_or_default();
        for row in rows {
            writer.write_record(header.iter().map(|column| cell(row.get(column))))?;
            self.written += 1;
        }
        Ok(())
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl Sink for CsvSink {
    fn write_single(&mut self, ctx: &ProcessingContext) -> Result<(), SinkError> {
        let row = self.to_row(ctx);
        self.write_rows(&[row])
    }

    fn write(&mut self, contexts: &[ProcessingContext]) -> Result<(), SinkError> {
        let rows: Vec<_> = contexts.iter().map(|ctx| self.to_row(ctx)).collect();
        self.write_rows(&rows)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Item, Payload};
    use crate::errors::ProcessorError;
    use crate::state::SharedState;
    use serde_json::{json, Value};

    fn finished(id: &str, fail: bool) -> ProcessingContext {
        let mut ctx = ProcessingContext::new(Item::with_id(id, Payload::new()), SharedState::new());
        if fail {
            ctx.mark_failure(ProcessorError::internal("p", "boom"));
        } else {
            ctx.mark_success();
        }
        ctx
    }

    #[test]
    fn test_memory_sink_keeps_failures() {
        let mut sink = MemorySink::new();
        sink.write(&[finished("1", false), finished("2", true)]).unwrap();
        sink.write_single(&finished("3", false)).unwrap();

        assert_eq!(sink.results().len(), 3);
        assert!(sink.results()[1].is_failure());
    }

    #[test]
    fn test_memory_sink_close_is_idempotent() {
        let mut sink = MemorySink::new();
        sink.close().unwrap();
        sink.close().unwrap();

        assert!(sink.is_closed());
        assert!(matches!(sink.write_single(&finished("1", false)), Err(SinkError::Closed(_))));
        assert!(sink.write(&[]).is_err());
    }

    #[test]
    fn test_json_lines_sink_writes_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");

        let mut sink = JsonLinesSink::create(&path).unwrap();
        sink.write(&[finished("1", false), finished("2", true)]).unwrap();
        assert_eq!(sink.written(), 2);
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(sink.write_single(&finished("3", false)).is_err());

        let content = std::fs::read_to_string(&path).unwrap();
        let records: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["processing"]["status"], json!("success"));
        assert_eq!(records[1]["processing"]["status"], json!("failure"));
        assert!(records[1]["processing"]["error"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn test_csv_sink_fixes_header_from_first_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.csv");

        let mut first = finished("1", false);
        first.item.payload.insert("name".to_string(), json!("alice"));
        let mut second = finished("2", true);
        second.item.payload.insert("score".to_string(), json!(9));

        let mut sink = CsvSink::create(&path).unwrap();
        sink.write(&[first, second]).unwrap();

        let mut late = finished("3", false);
        late.item.payload.insert("extra".to_string(), json!(true));
        sink.write_single(&late).unwrap();
        assert_eq!(sink.written(), 3);
        assert_eq!(
            sink.header().unwrap().to_vec(),
            vec!["_error", "_status", "name", "score"]
        );
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(matches!(sink.write_single(&late), Err(SinkError::Closed(_))));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "_error,_status,name,score");
        assert_eq!(lines[1], ",success,alice,");
        assert!(lines[2].ends_with(",failure,,9"));
        assert_eq!(lines[3], ",success,,");
    }

    #[test]
    fn test_csv_round_trip_through_source() {
        use crate::io::{CsvSource, Source};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("round.csv");

        let mut ctx = finished("7", false);
        ctx.item.payload.insert("id".to_string(), json!("7"));
        ctx.item.payload.insert("city".to_string(), json!("Lyon, FR"));
        ctx.item.metadata.insert("origin".to_string(), json!("api"));
        ctx.record("enrich");

        let adapter = Arc::new(CsvAdapter::new().with_metadata_fields(true));
        let mut sink = CsvSink::with_adapter(&path, adapter).unwrap();
        sink.write_single(&ctx).unwrap();
        sink.close().unwrap();

        let items = CsvSource::open(&path).unwrap().read().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "7");
        assert_eq!(items[0].payload_value("city"), Some(&json!("Lyon, FR")));
        assert_eq!(items[0].payload_value("_status"), Some(&json!("success")));
        assert_eq!(items[0].payload_value("_history"), Some(&json!("enrich")));
        assert_eq!(items[0].metadata_value("origin"), Some(&json!("api")));
    }
}
