//! The shared cursor over the URL list.
//!
//! Every worker pulls from the same [`WorkSource`]. Advancing the cursor is
//! the only serialized step: a worker holds the lock just long enough to
//! read the next non-blank line, so each line is handed out exactly once.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::error::UrlStatusError;

/// A newline-delimited list of URLs consumed by many workers.
pub struct WorkSource<R> {
    lines: Mutex<Lines<R>>,
    exhausted: AtomicBool,
    dispensed: AtomicUsize,
}

impl WorkSource<BufReader<File>> {
    /// Open a URL list file.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, UrlStatusError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| {
            UrlStatusError::file_error(
                path.to_string_lossy(),
                format!("Failed to open URL list: {}", e),
            )
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> WorkSource<R> {
    /// Wrap any buffered reader (file, stdin, in-memory bytes).
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            exhausted: AtomicBool::new(false),
            dispensed: AtomicUsize::new(0),
        }
    }

    /// Hand out the next URL, trimmed, skipping blank lines.
    ///
    /// Returns `Ok(None)` once the input is exhausted, and keeps doing so
    /// for every later call. A read failure also ends the source; the
    /// error is returned to the caller that hit it.
    pub async fn next(&self) -> Result<Option<String>, UrlStatusError> {
        if self.is_exhausted() {
            return Ok(None);
        }

        let mut lines = self.lines.lock().await;
        // Another worker may have reached the end while we were waiting.
        if self.is_exhausted() {
            return Ok(None);
        }

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let url = line.trim();
                    if url.is_empty() {
                        continue;
                    }
                    self.dispensed.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(url.to_string()));
                }
                Ok(None) => {
                    self.exhausted.store(true, Ordering::Release);
                    return Ok(None);
                }
                Err(e) => {
                    self.exhausted.store(true, Ordering::Release);
                    return Err(UrlStatusError::input(format!(
                        "Failed to read URL list after {} entries: {}",
                        self.dispensed(),
                        e
                    )));
                }
            }
        }
    }

    /// Whether the end of input has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    /// Number of URLs handed out so far.
    pub fn dispensed(&self) -> usize {
        self.dispensed.load(Ordering::Relaxed)
    }
}
