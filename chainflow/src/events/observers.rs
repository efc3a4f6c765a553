//! Stock observers.

use super::Observer;
use crate::core::{EventType, PipelineEvent};
use crate::errors::ObserverError;
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};

/// Writes every event to `tracing`.
///
/// Failure events are always logged at warn level; everything else uses
/// the configured level.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    level: Level,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingObserver {
    /// Creates a logging observer with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging observer.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging observer.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl Observer for LoggingObserver {
    fn on_event(&self, event: &PipelineEvent) -> Result<(), ObserverError> {
        let item_id = event.item_id.as_deref().unwrap_or("-");
        if matches!(event.event_type, EventType::ItemFailed | EventType::PipelineFailed) {
            warn!(
                event_type = %event.event_type,
                pipeline_id = %event.pipeline_id,
                item_id,
                error = event.error.as_deref().unwrap_or(""),
                "Event: {}", event.event_type
            );
            return Ok(());
        }

        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                pipeline_id = %event.pipeline_id,
                item_id,
                metadata = ?event.metadata,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                pipeline_id = %event.pipeline_id,
                item_id,
                metadata = ?event.metadata,
                "Event: {}", event.event_type
            );
        }
        Ok(())
    }
}

/// Records every event it receives.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types, in delivery order.
    #[must_use]
    pub fn event_types(&self) -> Vec<EventType> {
        self.events.read().iter().map(|e| e.event_type).collect()
    }

    /// Returns events of one type.
    #[must_use]
    pub fn events_of_type(&self, event_type: EventType) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl Observer for CollectingObserver {
    fn on_event(&self, event: &PipelineEvent) -> Result<(), ObserverError> {
        self.events.write().push(event.clone());
        Ok(())
    }
}

/// Line format used by [`FileObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// One serialized event object per line.
    #[default]
    Json,
    /// The event's `Display` rendering, one per line.
    Text,
}

/// Appends every event to a file.
///
/// Output is buffered and flushed on [`FileObserver::close`] or drop.
/// Events arriving after close are rejected.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    format: FileFormat,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl FileObserver {
    /// Opens `path` for appending, creating it and its parent directories.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened.
    pub fn create(path: impl AsRef<Path>, format: FileFormat) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            format,
            writer: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the line format.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Flushes buffered events without closing the file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the flush fails.
    pub fn flush(&self) -> io::Result<()> {
        match self.writer.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Flushes and closes the file. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the final flush fails.
    pub fn close(&self) -> io::Result<()> {
        match self.writer.lock().take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Returns true once [`FileObserver::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.writer.lock().is_none()
    }
}

impl Observer for FileObserver {
    fn on_event(&self, event: &PipelineEvent) -> Result<(), ObserverError> {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return Err(ObserverError::new(format!(
                "file observer for '{}' is closed",
                self.path.display()
            )));
        };

        let written = match self.format {
            FileFormat::Json => serde_json::to_writer(&mut *writer, event).map_err(io::Error::from),
            FileFormat::Text => write!(writer, "{event}"),
        };
        written
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|err| ObserverError::new(err.to_string()))
    }
}

impl Drop for FileObserver {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(path = %self.path.display(), error = %err, "Failed to flush event file");
        }
    }
}
