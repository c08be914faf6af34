use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::client::HttpClient;
use crate::error::UrlStatusError;

#[derive(Debug, Clone)]
enum Reply {
    Status(u16),
    Error(String),
    Delay(Duration),
}

/// Scripted HTTP client. Unparseable URLs fail, other unknown URLs answer 200.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeClient {
    replies: Arc<HashMap<String, Reply>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with_reply(mut self, url: &str, reply: Reply) -> Self {
        Arc::make_mut(&mut self.replies).insert(url.to_string(), reply);
        self
    }

    pub(crate) fn with_status(self, url: &str, status: u16) -> Self {
        self.with_reply(url, Reply::Status(status))
    }

    pub(crate) fn with_error(self, url: &str, message: &str) -> Self {
        self.with_reply(url, Reply::Error(message.to_string()))
    }

    /// Answer 200 after `delay`.
    pub(crate) fn with_delay(self, url: &str, delay: Duration) -> Self {
        self.with_reply(url, Reply::Delay(delay))
    }

    /// Normalized URLs requested so far, in call order.
    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn head(&self, url: &str) -> Result<u16, UrlStatusError> {
        self.requested.lock().unwrap().push(url.to_string());
        // Same rejection reqwest gives for URLs it cannot parse
        if let Err(e) = reqwest::Url::parse(url) {
            return Err(UrlStatusError::network_with_detail(
                "Invalid request",
                e.to_string(),
            ));
        }
        match self.replies.get(url).cloned() {
            Some(Reply::Status(status)) => Ok(status),
            Some(Reply::Error(message)) => Err(UrlStatusError::network(message)),
            Some(Reply::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(200)
            }
            None => Ok(200),
        }
    }
}

/// In-memory writer whose contents stay readable while a sink owns it.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
