//! Error handling for URL status checking.
//!
//! One error type covers every failure mode, from a single unreachable URL
//! to an output stream that can no longer be written. Per-URL failures are
//! never propagated out of the checker; they are folded into the result
//! record. Only configuration, input and sink failures abort a run.

use std::time::Duration;
use thiserror::Error;

/// Main error type for URL status operations.
#[derive(Debug, Clone, Error)]
pub enum UrlStatusError {
    /// The URL could not be normalized or has no host
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport-level failures (DNS, connect, TLS, protocol)
    #[error("{}", network_message(.message, .detail))]
    NetworkError {
        message: String,
        detail: Option<String>,
    },

    /// The request did not complete within the per-request timeout
    #[error("Timeout after {duration:?} during: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// A `[domain:]rate` specification that does not parse
    #[error("Invalid rate format: \"{raw}\"")]
    InvalidRate { raw: String },

    /// Configuration errors (invalid settings, etc.)
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Missing or unreadable config/input files
    #[error("File error at '{path}': {message}")]
    FileError { path: String, message: String },

    /// The URL source failed while being read
    #[error("Input error: {message}")]
    InputError { message: String },

    /// The output stream became unwritable
    #[error("Output error: {message}")]
    SinkError { message: String },

    /// A worker task panicked or was cancelled
    #[error("Worker failure: {message}")]
    WorkerError { message: String },

    /// Generic internal errors that don't fit other categories
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn network_message(message: &str, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("{}: {}", message, detail),
        None => message.to_string(),
    }
}

impl UrlStatusError {
    /// Create a new invalid URL error.
    pub fn invalid_url<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            detail: None,
        }
    }

    /// Create a new network error with the underlying cause attached.
    pub fn network_with_detail<M: Into<String>, D: Into<String>>(message: M, detail: D) -> Self {
        Self::NetworkError {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new invalid rate error.
    pub fn invalid_rate<R: Into<String>>(raw: R) -> Self {
        Self::InvalidRate { raw: raw.into() }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new input error.
    pub fn input<M: Into<String>>(message: M) -> Self {
        Self::InputError {
            message: message.into(),
        }
    }

    /// Create a new sink error.
    pub fn sink<M: Into<String>>(message: M) -> Self {
        Self::SinkError {
            message: message.into(),
        }
    }

    /// Create a new worker error.
    pub fn worker<M: Into<String>>(message: M) -> Self {
        Self::WorkerError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error belongs to a single URL and should end up in its
    /// result record instead of stopping the run.
    pub fn is_per_url(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::NetworkError { .. } | Self::Timeout { .. }
        )
    }

    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        !self.is_per_url()
    }

    /// Whether this error was raised while validating configuration,
    /// i.e. before any work started.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRate { .. } | Self::ConfigError { .. } | Self::FileError { .. }
        )
    }
}

impl From<reqwest::Error> for UrlStatusError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts with a known budget are mapped by the client itself.
        if err.is_timeout() {
            Self::network_with_detail("Request timed out", err.to_string())
        } else if err.is_connect() {
            Self::network_with_detail("Connection failed", err.to_string())
        } else if err.is_redirect() {
            Self::network_with_detail("Redirect failed", err.to_string())
        } else if err.is_builder() {
            Self::network_with_detail("Invalid request", err.to_string())
        } else {
            Self::network_with_detail("HTTP request failed", err.to_string())
        }
    }
}

impl From<std::io::Error> for UrlStatusError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<toml::de::Error> for UrlStatusError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}
