//! Error taxonomy for the session pipeline
//!
//! A retryable 401 is never an error value: the coordinator absorbs it and
//! the caller sees either the replayed response or a `Refresh` failure.

use transport::TransportError;

/// Why a credential refresh did not produce a new access token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    #[error("no refresh credential available")]
    MissingCredential,

    #[error("refresh credential rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("refresh endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("refresh abandoned before it settled")]
    Abandoned,
}

impl From<backoffice_auth::Error> for RefreshFailure {
    fn from(err: backoffice_auth::Error) -> Self {
        use backoffice_auth::Error as Auth;
        match err {
            Auth::Http(msg) => RefreshFailure::Network(msg),
            Auth::Rejected { status, body } => RefreshFailure::Rejected { status, body },
            Auth::Endpoint { status, body } => RefreshFailure::Endpoint { status, body },
            Auth::InvalidResponse(msg) => RefreshFailure::InvalidResponse(msg),
            other => RefreshFailure::InvalidResponse(other.to_string()),
        }
    }
}

/// Errors surfaced to service callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No response was received
    #[error("network failure: {0}")]
    Network(#[from] TransportError),

    /// Non-2xx other than a recoverable 401
    #[error("backend returned {status}")]
    Server { status: u16, body: String },

    /// 401 that must not (or can no longer) be recovered by refreshing
    #[error("not authorized ({status})")]
    AuthTerminal { status: u16, body: String },

    /// The session could not be refreshed and has been cleared
    #[error("session expired: {0}")]
    Refresh(#[from] RefreshFailure),

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("credential store error: {0}")]
    Store(String),
}

impl Error {
    /// Map a login failure onto the pipeline taxonomy. The login endpoint is
    /// public, so its 401/403 is terminal.
    pub fn from_login(err: backoffice_auth::Error) -> Self {
        use backoffice_auth::Error as Auth;
        match err {
            Auth::Http(msg) => Error::Network(TransportError::Request(msg)),
            Auth::Rejected { status, body } => Error::AuthTerminal { status, body },
            Auth::Endpoint { status, body } => Error::Server { status, body },
            Auth::InvalidResponse(msg) => Error::InvalidResponse(msg),
            other @ (Auth::CredentialParse(_) | Auth::Io(_)) => Error::Store(other.to_string()),
        }
    }

    /// HTTP status behind the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } | Error::AuthTerminal { status, .. } => Some(*status),
            Error::Refresh(RefreshFailure::Rejected { status, .. })
            | Error::Refresh(RefreshFailure::Endpoint { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Raw backend body behind the error, when one was received.
    pub fn backend_body(&self) -> Option<&str> {
        match self {
            Error::Server { body, .. } | Error::AuthTerminal { body, .. } => Some(body),
            Error::Refresh(RefreshFailure::Rejected { body, .. })
            | Error::Refresh(RefreshFailure::Endpoint { body, .. }) => Some(body),
            _ => None,
        }
    }

    /// Whether the session was cleared by a failed refresh. An abandoned
    /// refresh left the session untouched, so it does not count.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Refresh(failure) if *failure != RefreshFailure::Abandoned)
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_refresh_failures() {
        assert_eq!(
            RefreshFailure::from(backoffice_auth::Error::Http("refused".into())),
            RefreshFailure::Network("refused".into())
        );
        assert_eq!(
            RefreshFailure::from(backoffice_auth::Error::Rejected {
                status: 401,
                body: "expired".into()
            }),
            RefreshFailure::Rejected {
                status: 401,
                body: "expired".into()
            }
        );
    }

    #[test]
    fn login_rejection_is_terminal() {
        let err = Error::from_login(backoffice_auth::Error::Rejected {
            status: 401,
            body: "{}".into(),
        });
        assert_eq!(err.status(), Some(401));
        assert!(matches!(err, Error::AuthTerminal { .. }));
        assert!(!err.is_session_expired());
    }

    #[test]
    fn status_and_body_are_exposed() {
        let err = Error::Server {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.backend_body(), Some("oops"));

        let err = Error::Network(TransportError::Timeout("slow".into()));
        assert_eq!(err.status(), None);
        assert_eq!(err.backend_body(), None);
    }

    #[test]
    fn abandoned_refresh_is_not_an_expired_session() {
        assert!(Error::Refresh(RefreshFailure::MissingCredential).is_session_expired());
        assert!(!Error::Refresh(RefreshFailure::Abandoned).is_session_expired());
    }
}
