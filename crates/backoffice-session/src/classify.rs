//! Inbound outcome classification
//!
//! Sorts a completed exchange into the four outcomes the pipeline acts on.
//! Only `AuthRetryable` enters the refresh coordinator; everything else
//! resolves or rejects immediately.

use transport::{RequestDescriptor, Response};

use crate::policy::AuthPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx, passed through unchanged
    Success,
    /// 401 on a protected target that has not been replayed yet
    AuthRetryable,
    /// 401 after a replay, or on an auth-exempt target
    AuthTerminal,
    /// Any other status, or no response at all
    OtherFailure,
}

impl Classification {
    /// Label for metrics/logging.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Success => "success",
            Classification::AuthRetryable => "auth_retryable",
            Classification::AuthTerminal => "auth_terminal",
            Classification::OtherFailure => "other_failure",
        }
    }
}

/// Classify the result of sending `request`.
///
/// A 401 from an auth-exempt target is terminal: refreshing cannot help the
/// login/refresh endpoints themselves, and a pre-signed URL must never be
/// replayed with a bearer token attached.
pub fn classify(
    policy: &AuthPolicy,
    request: &RequestDescriptor,
    result: &transport::Result<Response>,
) -> Classification {
    let response = match result {
        Ok(response) => response,
        Err(_) => return Classification::OtherFailure,
    };

    if response.is_success() {
        return Classification::Success;
    }

    match response.status {
        401 if request.is_retried() || policy.skips_auth(&request.url) => {
            Classification::AuthTerminal
        }
        401 => Classification::AuthRetryable,
        _ => Classification::OtherFailure,
    }
}
