//! Serialized output of result records.
//!
//! [`ResultSink`] owns the output stream. Records are serialized before the
//! lock is taken, so the critical section is a single buffered write and a
//! record can never interleave with another. Flushing is sink-wide and
//! time based: whoever calls [`ResultSink::maybe_flush`] after the interval
//! has passed pays for the flush.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::UrlStatusError;
use crate::types::{CheckResult, OutputFormat, DEFAULT_FLUSH_INTERVAL};

/// Column names written when CSV headers are enabled.
pub const CSV_HEADER: [&str; 2] = ["url", "status"];

struct SinkState<W> {
    writer: BufWriter<W>,
    last_flush: Instant,
    header_pending: bool,
    /// First write/flush failure; the sink refuses all work afterwards
    failure: Option<String>,
    closed: bool,
}

/// Thread-safe writer of [`CheckResult`] records.
pub struct ResultSink<W> {
    state: Mutex<SinkState<W>>,
    format: OutputFormat,
    flush_interval: Duration,
    written: AtomicUsize,
}

impl<W: AsyncWrite + Unpin> ResultSink<W> {
    /// Create a sink writing `format` records to `writer`.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer: BufWriter::new(writer),
                last_flush: Instant::now(),
                header_pending: false,
                failure: None,
                closed: false,
            }),
            format,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            written: AtomicUsize::new(0),
        }
    }

    /// Emit a `url,status` header row before the first CSV record.
    /// Ignored for JSON output.
    pub fn with_csv_headers(mut self, enabled: bool) -> Self {
        self.state.get_mut().header_pending = enabled && self.format == OutputFormat::Csv;
        self
    }

    /// Change how often [`maybe_flush`](Self::maybe_flush) actually flushes.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the stream cannot be written, has failed
    /// before, or was already closed.
    pub async fn write(&self, record: &CheckResult) -> Result<(), UrlStatusError> {
        let bytes = self.serialize(record)?;

        let mut state = self.state.lock().await;
        Self::ensure_usable(&state)?;

        if state.header_pending {
            let header = encode_csv_row(&CSV_HEADER)?;
            Self::write_locked(&mut state, &header).await?;
            state.header_pending = false;
        }

        Self::write_locked(&mut state, &bytes).await?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Flush if at least the flush interval has passed since the last flush.
    pub async fn maybe_flush(&self) -> Result<(), UrlStatusError> {
        let mut state = self.state.lock().await;
        Self::ensure_usable(&state)?;

        if state.last_flush.elapsed() >= self.flush_interval {
            Self::flush_locked(&mut state).await?;
        }
        Ok(())
    }

    /// Final, unconditional flush. Later calls are no-ops; later writes fail.
    pub async fn close(&self) -> Result<(), UrlStatusError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        Self::ensure_usable(&state)?;

        if state.header_pending {
            let header = encode_csv_row(&CSV_HEADER)?;
            Self::write_locked(&mut state, &header).await?;
            state.header_pending = false;
        }

        Self::flush_locked(&mut state).await?;
        state.closed = true;
        tracing::debug!(records = self.records_written(), "result sink closed");
        Ok(())
    }

    /// Number of records accepted so far.
    pub fn records_written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    /// Give back the underlying writer. Anything not yet flushed is lost,
    /// so call [`close`](Self::close) first.
    pub fn into_inner(self) -> W {
        self.state.into_inner().writer.into_inner()
    }

    fn serialize(&self, record: &CheckResult) -> Result<Vec<u8>, UrlStatusError> {
        match self.format {
            OutputFormat::Csv => {
                let rendered = record.rendered();
                encode_csv_row(&[record.url.as_str(), rendered.as_str()])
            }
            OutputFormat::Json => {
                let mut line = serde_json::to_vec(record).map_err(|e| {
                    UrlStatusError::internal(format!("Failed to encode record: {}", e))
                })?;
                line.push(b'\n');
                Ok(line)
            }
        }
    }

    fn ensure_usable(state: &SinkState<W>) -> Result<(), UrlStatusError> {
        if let Some(failure) = &state.failure {
            return Err(UrlStatusError::sink(format!(
                "output stream failed earlier: {}",
                failure
            )));
        }
        if state.closed {
            return Err(UrlStatusError::sink("output stream already closed"));
        }
        Ok(())
    }

    async fn write_locked(state: &mut SinkState<W>, bytes: &[u8]) -> Result<(), UrlStatusError> {
        if let Err(e) = state.writer.write_all(bytes).await {
            state.failure = Some(e.to_string());
            return Err(UrlStatusError::sink(format!("write failed: {}", e)));
        }
        Ok(())
    }

    async fn flush_locked(state: &mut SinkState<W>) -> Result<(), UrlStatusError> {
        if let Err(e) = state.writer.flush().await {
            state.failure = Some(e.to_string());
            return Err(UrlStatusError::sink(format!("flush failed: {}", e)));
        }
        state.last_flush = Instant::now();
        Ok(())
    }
}

fn encode_csv_row(fields: &[&str]) -> Result<Vec<u8>, UrlStatusError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(fields)
        .map_err(|e| UrlStatusError::internal(format!("Failed to encode record: {}", e)))?;

    writer
        .into_inner()
        .map_err(|e| UrlStatusError::internal(format!("Failed to encode record: {}", e)))
}
