//! Request and response values exchanged with a `Transport`

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::{Result, TransportError};

/// An outgoing request plus the one-shot "already retried" marker.
///
/// `url` is either a path relative to the backend base URL (`/user/42`) or an
/// absolute URL (pre-signed storage uploads). The marker is set the first time
/// the request is replayed after a credential refresh and never cleared.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub id: Uuid,
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn post_json<T: Serialize + ?Sized>(url: impl Into<String>, payload: &T) -> Result<Self> {
        Self::new(Method::POST, url).with_json(payload)
    }

    pub fn put_json<T: Serialize + ?Sized>(url: impl Into<String>, payload: &T) -> Result<Self> {
        Self::new(Method::PUT, url).with_json(payload)
    }

    pub fn patch_json<T: Serialize + ?Sized>(url: impl Into<String>, payload: &T) -> Result<Self> {
        Self::new(Method::PATCH, url).with_json(payload)
    }

    /// Raw body upload with an explicit content type (e.g. a PDF to a pre-signed URL).
    pub fn put_bytes(url: impl Into<String>, body: Bytes, content_type: HeaderValue) -> Self {
        let mut request = Self::new(Method::PUT, url);
        request.headers.insert(CONTENT_TYPE, content_type);
        request.body = Some(body);
        request
    }

    /// Serialize `payload` as the JSON body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| TransportError::Encode(format!("serializing JSON body: {e}")))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    ///
    /// Returns false (leaving the headers untouched) if the token contains
    /// bytes that are not valid in a header value.
    pub fn set_bearer(&mut self, token: &str) -> bool {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
                true
            }
            Err(e) => {
                warn!(request_id = %self.id, error = %e, "access token is not a valid header value");
                false
            }
        }
    }

    /// The bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Convenience for JSON bodies (used heavily by scripted transports).
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| TransportError::Decode(format!("parsing JSON body: {e}")))
    }
}
