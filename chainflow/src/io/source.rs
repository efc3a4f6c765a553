//! Item sources.

use super::{Adapter, CsvAdapter, JsonAdapter};
use crate::core::Item;
use crate::errors::SourceError;
use csv::StringRecord;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Produces items for a pipeline.
///
/// Closing is idempotent; reading from a closed source is an error.
pub trait Source: Send {
    /// Returns a short name used in error messages.
    fn name(&self) -> &str;

    /// Pulls the next item, or `None` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is closed or a record is unreadable.
    fn read_next(&mut self) -> Result<Option<Item>, SourceError>;

    /// Drains every remaining item.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Source::read_next`].
    fn read(&mut self) -> Result<Vec<Item>, SourceError> {
        let mut items = Vec::new();
        while let Some(item) = self.read_next()? {
            items.push(item);
        }
        Ok(items)
    }

    /// Releases the source.
    ///
    /// # Errors
    ///
    /// Returns an error if underlying resources fail to release.
    fn close(&mut self) -> Result<(), SourceError>;

    /// Returns true once [`Source::close`] has been called.
    fn is_closed(&self) -> bool;
}

/// Serves items from memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    items: VecDeque<Item>,
    closed: bool,
}

impl MemorySource {
    /// Creates a source over `items`.
    #[must_use]
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().collect(),
            closed: false,
        }
    }

    /// Returns the number of items not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        "MemorySource"
    }

    fn read_next(&mut self) -> Result<Option<Item>, SourceError> {
        if self.closed {
            return Err(SourceError::Closed(self.name().to_string()));
        }
        Ok(self.items.pop_front())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Reads one JSON object per line from a file.
///
/// Blank lines are ignored. Each record is converted by the configured
/// [`Adapter`]; malformed lines report their 1-based line number.
#[derive(Debug)]
pub struct JsonLinesSource {
    path: PathBuf,
    adapter: Arc<dyn Adapter>,
    lines: Option<Lines<BufReader<File>>>,
    line_number: usize,
}

impl JsonLinesSource {
    /// Opens `path` using the default [`JsonAdapter`].
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Self::with_adapter(path, Arc::new(JsonAdapter::default()))
    }

    /// Opens `path` using `adapter`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened.
    pub fn with_adapter(
        path: impl AsRef<Path>,
        adapter: Arc<dyn Adapter>,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            adapter,
            lines: Some(BufReader::new(file).lines()),
            line_number: 0,
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for JsonLinesSource {
    fn name(&self) -> &str {
        "JsonLinesSource"
    }

    fn read_next(&mut self) -> Result<Option<Item>, SourceError> {
        let Some(lines) = self.lines.as_mut() else {
            return Err(SourceError::Closed("JsonLinesSource".to_string()));
        };

        for line in lines.by_ref() {
            self.line_number += 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let location = || format!("{}:{}", self.path.display(), self.line_number);
            let raw: Value =
                serde_json::from_str(trimmed).map_err(|err| SourceError::Malformed {
                    location: location(),
                    reason: err.to_string(),
                })?;
            return match self.adapter.to_item(&raw) {
                Ok(item) => Ok(Some(item)),
                Err(SourceError::Malformed { reason, .. }) => Err(SourceError::Malformed {
                    location: location(),
                    reason,
                }),
                Err(other) => Err(other),
            };
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.lines = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.lines.is_none()
    }
}

/// Streams rows from a CSV file with a header line.
///
/// Each row becomes an object keyed by header name, with every cell as a
/// string, and is converted by the configured [`Adapter`]. Malformed rows
/// report their 1-based row number, counting the header as row 1.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    adapter: Arc<dyn Adapter>,
    reader: Option<csv::Reader<File>>,
    headers: StringRecord,
    record: StringRecord,
    row_number: usize,
}

impl CsvSource {
    /// Opens `path` using the default [`CsvAdapter`].
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened, or a CSV error if
    /// the header line is unreadable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Self::with_adapter(path, Arc::new(CsvAdapter::default()))
    }

    /// Opens `path` using `adapter`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened, or a CSV error if
    /// the header line is unreadable.
    pub fn with_adapter(
        path: impl AsRef<Path>,
        adapter: Arc<dyn Adapter>,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader.headers()?.clone();
        Ok(Self {
            path,
            adapter,
            reader: Some(reader),
            headers,
            record: StringRecord::new(),
            row_number: 1,
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the header names.
    #[must_use]
    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }
}

impl Source for CsvSource {
    fn name(&self) -> &str {
        "CsvSource"
    }

    fn read_next(&mut self) -> Result<Option<Item>, SourceError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(SourceError::Closed("CsvSource".to_string()));
        };
        if !reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        self.row_number += 1;

        let row: Map<String, Value> = self
            .headers
            .iter()
            .zip(self.record.iter())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();
        match self.adapter.to_item(&Value::Object(row)) {
            Ok(item) => Ok(Some(item)),
            Err(SourceError::Malformed { reason, .. }) => Err(SourceError::Malformed {
                location: format!("{}:{}", self.path.display(), self.row_number),
                reason,
            }),
            Err(other) => Err(other),
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}
