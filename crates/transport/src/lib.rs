//! Raw HTTP transport abstraction for the back-office client
//!
//! Defines the `Transport` trait that decouples the session pipeline from the
//! HTTP stack. `ReqwestTransport` is the production implementation; tests
//! substitute scripted in-memory transports implementing the same trait.
//!
//! The transport never interprets status codes: any response that arrives is
//! returned as `Ok(Response)`, and only failures to obtain a response at all
//! (connect errors, timeouts) are reported as `TransportError`.

pub mod descriptor;
pub mod reqwest_transport;

pub use bytes::Bytes;
pub use descriptor::{RequestDescriptor, Response};
pub use reqwest::Method;
pub use reqwest::header;
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest_transport::ReqwestTransport;

use std::future::Future;
use std::pin::Pin;

/// Failure to obtain a response from the remote end.
///
/// String payloads keep the error `Clone` so a single failure can be handed
/// to every caller waiting on the same operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request body encoding failed: {0}")]
    Encode(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Sends a fully prepared request and returns whatever the server answered.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;
}
