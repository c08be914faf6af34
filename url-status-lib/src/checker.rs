//! Status checking for a single URL.
//!
//! This module provides the `StatusChecker` that turns one input line into
//! one [`CheckResult`]: normalize, find the domain, pass the rate gate,
//! request, and capture whatever happened.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{HttpClient, ReqwestClient};
use crate::error::UrlStatusError;
use crate::ratelimit::RateLimitRegistry;
use crate::types::{CheckConfig, CheckResult};
use crate::utils::{extract_domain, normalize_url};

/// Checks URLs through an [`HttpClient`], honouring rate limits.
///
/// Cheap to clone; every worker gets its own handle onto the same client
/// and registry.
///
/// # Example
///
/// ```rust,no_run
/// use url_status_lib::{CheckConfig, StatusChecker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = CheckConfig::default().with_rate_limits(vec!["example.com:1".into()]);
///     let checker = StatusChecker::from_config(&config)?;
///     let result = checker.check("example.com/about").await;
///     println!("{}: {}", result.url, result.rendered());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct StatusChecker {
    /// Network collaborator
    client: Arc<dyn HttpClient>,
    /// Per-domain rate gates
    limits: Arc<RateLimitRegistry>,
    /// Upper bound on a single request, whatever the client does
    timeout: Duration,
}

impl StatusChecker {
    /// Create a checker from explicit parts.
    pub fn new(client: Arc<dyn HttpClient>, limits: RateLimitRegistry, timeout: Duration) -> Self {
        Self {
            client,
            limits: Arc::new(limits),
            timeout,
        }
    }

    /// Create a checker with the reqwest client and the rate limits named
    /// in `config`.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error if a rate specification is
    /// malformed or the HTTP client cannot be built.
    pub fn from_config(config: &CheckConfig) -> Result<Self, UrlStatusError> {
        let limits = RateLimitRegistry::from_specs(&config.rate_limits)?;
        let client = ReqwestClient::new(config)?;
        Ok(Self::new(Arc::new(client), limits, config.timeout))
    }

    /// The rate limits this checker applies.
    pub fn limits(&self) -> &RateLimitRegistry {
        &self.limits
    }

    /// Check one URL. Never fails: every per-URL problem becomes an error
    /// record carrying the failure message.
    pub async fn check(&self, raw: &str) -> CheckResult {
        let outcome = match self.admit(raw).await {
            Ok(url) => self.send(&url).await,
            Err(e) => Err(e),
        };
        self.record(raw, outcome)
    }

    /// Like [`check`](Self::check), but gives up if `stop` completes before
    /// the request has been sent, including while waiting on a rate gate.
    ///
    /// Returns `None` when the URL was abandoned. A request that is already
    /// on the wire always runs to completion.
    pub async fn check_unless<F>(&self, raw: &str, stop: F) -> Option<CheckResult>
    where
        F: Future<Output = ()>,
    {
        let admitted = tokio::select! {
            biased;
            () = stop => {
                tracing::debug!(url = raw, "abandoned before request");
                return None;
            }
            admitted = self.admit(raw) => admitted,
        };

        let outcome = match admitted {
            Ok(url) => self.send(&url).await,
            Err(e) => Err(e),
        };
        Some(self.record(raw, outcome))
    }

    /// Normalize, find the domain and pass its rate gate. Yields the URL
    /// to request.
    async fn admit(&self, raw: &str) -> Result<String, UrlStatusError> {
        let url = normalize_url(raw);
        let domain = extract_domain(&url)
            .ok_or_else(|| UrlStatusError::invalid_url(raw, "no host found"))?;

        if let Some(limit) = self.limits.resolve(&domain) {
            limit.acquire().await;
        }
        Ok(url)
    }

    async fn send(&self, url: &str) -> Result<u16, UrlStatusError> {
        match tokio::time::timeout(self.timeout, self.client.head(url)).await {
            Ok(result) => result,
            Err(_) => Err(UrlStatusError::timeout(format!("HEAD {}", url), self.timeout)),
        }
    }

    fn record(&self, raw: &str, outcome: Result<u16, UrlStatusError>) -> CheckResult {
        let result = match outcome {
            Ok(status) => CheckResult::status(raw, status),
            Err(e) => CheckResult::error(raw, e.to_string()),
        };

        tracing::debug!(url = raw, outcome = %result.outcome, "checked");
        result
    }
}
