//! Human-readable messages for failed requests
//!
//! The backend reports problems in its JSON envelope, either as a string
//! `data` field or a `message` field. The most specific text available wins:
//! backend `data`, backend `message`, the error's own description, then the
//! caller's default.

use crate::error::Error;
use crate::gate::SessionExpiryGate;

pub const DEFAULT_ERROR_MESSAGE: &str = "An internal error occurred";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Sign in again.";

/// Backend-supplied message from a response body, if there is one.
pub fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["data", "message"].iter().find_map(|field| {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// The most specific message available for `error`.
pub fn error_message(error: &Error, default: &str) -> String {
    if let Some(message) = error.backend_body().and_then(backend_message) {
        return message;
    }
    let generic = error.to_string();
    if generic.trim().is_empty() {
        return default.to_string();
    }
    generic
}

/// What the alerting layer should show for a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// First report of an expired session in this episode
    SessionExpired,
    /// Expired session already reported; stay quiet
    Suppressed,
    Error { message: String, code: Option<u16> },
}

impl Alert {
    /// Decide the alert for `error`, consuming the expiry gate when relevant.
    pub fn for_error(error: &Error, gate: &SessionExpiryGate) -> Self {
        if error.is_session_expired() {
            return if gate.should_notify() {
                Alert::SessionExpired
            } else {
                Alert::Suppressed
            };
        }
        Alert::Error {
            message: error_message(error, DEFAULT_ERROR_MESSAGE),
            code: error.status(),
        }
    }

    /// Display text, or `None` when nothing should be shown.
    pub fn text(&self) -> Option<String> {
        match self {
            Alert::SessionExpired => Some(SESSION_EXPIRED_MESSAGE.to_string()),
            Alert::Suppressed => None,
            Alert::Error {
                message,
                code: Some(code),
            } => Some(format!("{message} COD-{code}")),
            Alert::Error {
                message,
                code: None,
            } => Some(message.clone()),
        }
    }
}
