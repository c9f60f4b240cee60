//! `reqwest`-backed transport
//!
//! Joins relative request paths onto the configured backend base URL and
//! forwards absolute URLs (pre-signed uploads) untouched. Every request gets
//! the configured timeout; timeouts and connect failures surface as distinct
//! `TransportError` variants so callers can report them precisely.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::{RequestDescriptor, Response, Result, Transport, TransportError};

/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a request target.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.resolve_url(&request.url);

            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .headers(request.headers.clone())
                .timeout(self.timeout);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(format!("{} {url}: {e}", request.method))
                } else if e.is_connect() {
                    TransportError::Connect(format!("{} {url}: {e}", request.method))
                } else {
                    TransportError::Request(format!("{} {url}: {e}", request.method))
                }
            })?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Request(format!("reading response body: {e}")))?;

            debug!(
                request_id = %request.id,
                method = %request.method,
                status,
                bytes = body.len(),
                "backend responded"
            );

            Ok(Response {
                status,
                headers,
                body,
            })
        })
    }
}
