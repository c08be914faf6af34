//! Core data types for URL status checking.
//!
//! This module defines the result record produced for every input URL,
//! the engine configuration, and the counters a run reports back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::UrlStatusError;

/// Result of checking a single URL.
///
/// Exactly one record is produced per non-blank input line. The `url`
/// field always holds the line as it was read, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// The URL as it appeared in the input
    pub url: String,

    /// Final status code, or the reason no status could be obtained
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// What happened when a URL was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Numeric HTTP status after following redirects
    Status(u16),

    /// Transport, timeout or URL error message
    Error(String),
}

impl CheckResult {
    /// Create a record holding a status code.
    pub fn status<U: Into<String>>(url: U, status: u16) -> Self {
        Self {
            url: url.into(),
            outcome: Outcome::Status(status),
        }
    }

    /// Create a record holding an error description.
    pub fn error<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self {
            url: url.into(),
            outcome: Outcome::Error(message.into()),
        }
    }

    /// Whether a status code was obtained (of any class, 4xx/5xx included).
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Status(_))
    }

    /// The second output column: `"200"` or `"ERROR: <message>"`.
    pub fn rendered(&self) -> String {
        self.outcome.to_string()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(code) => write!(f, "{}", code),
            Outcome::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// Serialization used for the result stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Two-column CSV: `url,status`
    #[default]
    Csv,

    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = UrlStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            other => Err(UrlStatusError::config(format!(
                "Unknown output format '{}', expected 'csv' or 'json'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Default worker pool size.
pub const DEFAULT_CONCURRENCY: usize = 200;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time between periodic flushes of the result stream.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Configuration options for a checking run.
///
/// Built by the caller (usually the CLI, after merging config files,
/// environment and flags) and passed explicitly into the constructors
/// that need it. Nothing in the library reads global settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConfig {
    /// Number of concurrent workers
    /// Default: 200
    pub concurrency: usize,

    /// Timeout for each individual request, redirects included
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Accept invalid TLS certificates
    /// Default: false
    pub ignore_tls_errors: bool,

    /// Raw `[domain:]rate` specifications, parsed into a registry
    /// Default: empty (no throttling)
    pub rate_limits: Vec<String>,

    /// Output serialization
    /// Default: CSV
    pub format: OutputFormat,

    /// Write a `url,status` header row before CSV records
    /// Default: false
    pub csv_headers: bool,

    /// Minimum time between periodic flushes of the output
    /// Default: 2 seconds
    pub flush_interval: Duration,

    /// Redirects followed before a request fails
    /// Default: 10
    pub max_redirects: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            ignore_tls_errors: false,
            rate_limits: Vec::new(),
            format: OutputFormat::Csv,
            csv_headers: false,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl CheckConfig {
    /// Set the worker pool size. Values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accept or reject invalid TLS certificates.
    pub fn with_ignore_tls_errors(mut self, ignore: bool) -> Self {
        self.ignore_tls_errors = ignore;
        self
    }

    /// Replace the rate limit specifications.
    pub fn with_rate_limits(mut self, specs: Vec<String>) -> Self {
        self.rate_limits = specs;
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable the CSV header row.
    pub fn with_csv_headers(mut self, enabled: bool) -> Self {
        self.csv_headers = enabled;
        self
    }

    /// Set the periodic flush interval.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set how many redirects to follow.
    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }
}

/// Live counters shared between the worker pool and any observer
/// (progress display, tests).
#[derive(Debug, Default)]
pub struct Progress {
    checked: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl Progress {
    /// Count one finished record.
    pub fn record(&self, result: &CheckResult) {
        self.checked.fetch_add(1, Ordering::Relaxed);
        if result.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records written so far.
    pub fn checked(&self) -> usize {
        self.checked.load(Ordering::Relaxed)
    }

    /// Records that carry a status code.
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Records that carry an error.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Totals reported once a run has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub(crate) fn from_progress(progress: &Progress, duration: Duration) -> Self {
        Self {
            checked: progress.checked(),
            succeeded: progress.succeeded(),
            failed: progress.failed(),
            duration,
        }
    }
}
