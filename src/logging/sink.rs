//! Destinations for emitted records.
//!
//! A [`Sink`] receives records in call order. Sinks may fail; the logger
//! never propagates those failures and instead writes a best-effort line to
//! stderr.

use super::record::LogRecord;
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;

/// Errors a sink may report.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink rejected record: {0}")]
    Rejected(String),
}

/// Destination for log records.
pub trait Sink: fmt::Debug + Send + Sync {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError>;

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one formatted line per record to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut lock = std::io::stderr().lock();
        writeln!(lock, "{record}")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        std::io::stderr().flush()?;
        Ok(())
    }
}

/// Writes newline-delimited JSON to any writer.
pub struct JsonSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> fmt::Debug for JsonSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSink").finish_non_exhaustive()
    }
}

impl<W: Write + Send> Sink for JsonSink<W> {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

/// Keeps records in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record captured so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Remove and return every captured record.
    pub fn drain(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Captured records whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.message.contains(needle))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Sink for MemorySink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Fans each record out to several sinks.
///
/// Every sink sees every record even when an earlier one fails; the first
/// failure is reported.
#[derive(Debug, Default, Clone)]
pub struct TeeSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Sink for TeeSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.write(record) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Last-resort diagnostic line. Never fails.
pub(crate) fn fallback(message: &str) {
    let _ = writeln!(std::io::stderr().lock(), "strand: {message}");
}

/// Deliver `record`, demoting any sink failure to a fallback line.
pub(crate) fn deliver(sink: &dyn Sink, record: &LogRecord) {
    if let Err(e) = sink.write(record) {
        fallback(&format!("log sink failed ({e}); dropped record: {record}"));
    }
}
