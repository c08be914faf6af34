//! The HTTP collaborator.
//!
//! The engine only needs one operation from the network layer: issue a
//! HEAD request, follow redirects, and report the final status code. The
//! [`HttpClient`] trait is that seam; [`ReqwestClient`] is the production
//! implementation.

use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::time::Duration;

use crate::error::UrlStatusError;
use crate::types::CheckConfig;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("url-status/", env!("CARGO_PKG_VERSION"));

/// Extra time the transport gets on top of the configured timeout, so
/// the checker's deadline is always the one that fires.
pub const TRANSPORT_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// Something that can report the status code of a URL.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Request `url` (already normalized) and return the final status
    /// code after redirects, or a per-URL error.
    async fn head(&self, url: &str) -> Result<u16, UrlStatusError>;
}

/// HEAD-request client backed by reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    /// Shared connection pool
    http_client: reqwest::Client,
    /// Transport-level timeout, reported in timeout errors
    timeout: Duration,
}

impl ReqwestClient {
    /// Build a client from the run configuration.
    ///
    /// Uses the configured redirect limit and TLS verification mode. The
    /// transport timeout is the configured one plus
    /// [`TRANSPORT_TIMEOUT_MARGIN`].
    pub fn new(config: &CheckConfig) -> Result<Self, UrlStatusError> {
        let timeout = config.timeout.saturating_add(TRANSPORT_TIMEOUT_MARGIN);
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.ignore_tls_errors)
            .build()
            .map_err(|e| UrlStatusError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    /// The transport-level timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn head(&self, url: &str) -> Result<u16, UrlStatusError> {
        let response = self.http_client.head(url).send().await.map_err(|e| {
            if e.is_timeout() {
                UrlStatusError::timeout(format!("HEAD {}", url), self.timeout)
            } else {
                UrlStatusError::from(e)
            }
        })?;

        Ok(response.status().as_u16())
    }
}
