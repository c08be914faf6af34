//! Utility functions for URL normalization and parsing.
//!
//! These helpers are deliberately lenient: they only add a default scheme
//! and pick out the host used for rate-limit matching. Full URL validation
//! is left to the HTTP client, whose errors end up in the result record.

use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

/// Scheme prepended to URLs that do not carry one.
pub const DEFAULT_SCHEME: &str = "http://";

lazy_static! {
    static ref SCHEME_PATTERN: Regex = Regex::new(r"^\w+://").expect("valid scheme pattern");
    static ref AUTHORITY_PATTERN: Regex =
        Regex::new(r"^[^:]+://(?:[^/@]*@)?([^/:]+)").expect("valid authority pattern");
}

/// Prefix `http://` when the URL has no `scheme://` part.
///
/// ```
/// use url_status_lib::normalize_url;
///
/// assert_eq!(normalize_url("example.com/path"), "http://example.com/path");
/// assert_eq!(normalize_url("https://example.com"), "https://example.com");
/// ```
pub fn normalize_url(raw: &str) -> String {
    if SCHEME_PATTERN.is_match(raw) {
        raw.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, raw)
    }
}

/// Extract the host of a normalized URL: everything between `scheme://`
/// (and any `user:password@` part) and the first `/` or `:`. The result
/// is lowercased so it can be compared against rate-limit scopes.
///
/// Returns `None` when there is no scheme or the authority is empty.
pub fn extract_domain(url: &str) -> Option<String> {
    AUTHORITY_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|host| host.as_str().to_lowercase())
}

/// Parse a timeout string like "5s", "30s", "2m", "500ms" or a bare number
/// of seconds.
///
/// # Returns
///
/// The duration, or None if parsing fails.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    }
}
