//! # URL Status Library
//!
//! A bounded-concurrency engine for checking the HTTP status of large URL
//! lists.
//!
//! A fixed pool of workers pulls URLs from a single shared source, passes
//! each one through an optional per-domain rate gate, issues a HEAD request
//! and writes one record per URL to a shared output stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use url_status_lib::{CheckConfig, OutputFormat, ResultSink, StatusChecker, WorkSource, WorkerPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CheckConfig::default()
//!         .with_concurrency(50)
//!         .with_rate_limits(vec!["example.com:2".to_string()]);
//!
//!     let checker = StatusChecker::from_config(&config)?;
//!     let source = WorkSource::open("urls.txt").await?;
//!     let sink = ResultSink::new(tokio::io::stdout(), OutputFormat::Csv);
//!
//!     let summary = WorkerPool::from_config(&config).run(source, checker, sink).await?;
//!     eprintln!("{} checked, {} failed", summary.checked, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bounded pool**: the pool size is the only admission control
//! - **Rate gates**: minimum spacing per domain (subdomains included) or globally
//! - **Exactly-once**: every non-blank input line yields exactly one record
//! - **Failures are data**: DNS, TLS, timeout and URL errors become records

// Re-export main public API types and functions
// This makes them available as url_status_lib::TypeName
pub use checker::StatusChecker;
pub use client::{HttpClient, ReqwestClient, TRANSPORT_TIMEOUT_MARGIN, USER_AGENT};
pub use concurrent::WorkerPool;
pub use config::{
    load_env_config, load_env_config_from, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
    OutputConfig,
};
pub use error::UrlStatusError;
pub use ratelimit::{RateLimit, RateLimitRegistry};
pub use sink::ResultSink;
pub use source::WorkSource;
pub use types::{
    CheckConfig, CheckResult, Outcome, OutputFormat, Progress, RunSummary, DEFAULT_CONCURRENCY,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_TIMEOUT,
};
pub use utils::{extract_domain, normalize_url, parse_timeout_string};

// Internal modules - these are not part of the public API
mod checker;
mod client;
mod concurrent;
mod config;
mod error;
mod ratelimit;
mod sink;
mod source;
mod types;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, UrlStatusError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
