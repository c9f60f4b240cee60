//! Error types for account authentication operations

/// Errors from login, refresh, and credential storage.
///
/// Payloads are strings so the error is `Clone`: one refresh failure is
/// delivered to every request waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("credentials rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("auth endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
