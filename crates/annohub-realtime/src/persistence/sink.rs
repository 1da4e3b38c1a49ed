//! Durable append targets for broadcast records.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use annohub_core::result::AppResult;

use crate::message::serializer::{self, LOG_CLOSE, LOG_OPEN, LOG_SEPARATOR};
use crate::message::Message;

/// A durable, append-only target for broadcast records.
///
/// Implementations are driven from a single writer thread and may block.
pub trait AnnotationSink: Send + 'static {
    /// (Re)open the target inside `directory`, closing any open target first.
    fn open(&mut self, directory: &Path) -> AppResult<()>;

    /// Append one record. A no-op while closed.
    fn write(&mut self, message: &Message) -> AppResult<()>;

    /// Write the terminator and release the target. Idempotent.
    fn close(&mut self) -> AppResult<()>;

    /// Whether a target is currently open.
    fn is_open(&self) -> bool;
}

/// Writes a JSON array of records to `<directory>/<file_name>`.
///
/// The opening bracket is written on open and the closing bracket on
/// close, so a cleanly closed file is a well-formed JSON document and a
/// crashed one is a readable prefix.
#[derive(Debug)]
pub struct FileSink {
    file_name: String,
    log: Option<JsonArrayLog<BufWriter<File>>>,
}

impl FileSink {
    /// Create a closed sink that will write to `file_name` once opened.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            log: None,
        }
    }
}

impl AnnotationSink for FileSink {
    fn open(&mut self, directory: &Path) -> AppResult<()> {
        self.close()?;

        fs::create_dir_all(directory)?;
        let file = File::create(directory.join(&self.file_name))?;
        self.log = Some(JsonArrayLog::start(BufWriter::new(file))?);
        Ok(())
    }

    fn write(&mut self, message: &Message) -> AppResult<()> {
        let Some(log) = self.log.as_mut() else {
            return Ok(());
        };
        let record = serializer::serialize_record(message)?;
        log.append(&record)?;
        Ok(())
    }

    fn close(&mut self) -> AppResult<()> {
        if let Some(log) = self.log.take() {
            log.finish()?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.log.is_some()
    }
}

/// JSON array framing over any writer.
///
/// An entry counts as written once any of its bytes are accepted, so a
/// failed append never leaves the next one without its separator or with
/// a doubled one.
#[derive(Debug)]
struct JsonArrayLog<W: Write> {
    inner: W,
    records: u64,
}

impl<W: Write> JsonArrayLog<W> {
    fn start(mut inner: W) -> io::Result<Self> {
        inner.write_all(LOG_OPEN.as_bytes())?;
        inner.flush()?;
        Ok(Self { inner, records: 0 })
    }

    fn append(&mut self, record: &str) -> io::Result<()> {
        let mut entry = String::with_capacity(record.len() + LOG_SEPARATOR.len());
        if self.records > 0 {
            entry.push_str(LOG_SEPARATOR);
        }
        entry.push_str(record);

        let bytes = entry.as_bytes();
        let mut sent = 0;
        let result = loop {
            if sent == bytes.len() {
                break Ok(());
            }
            match self.inner.write(&bytes[sent..]) {
                Ok(0) => break Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => sent += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        if sent > 0 {
            self.records += 1;
        }
        result?;
        self.inner.flush()
    }

    fn finish(mut self) -> io::Result<()> {
        self.inner.write_all(LOG_CLOSE.as_bytes())?;
        self.inner.flush()
    }
}
