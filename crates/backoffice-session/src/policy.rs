//! Outbound credential attachment
//!
//! Decides per request whether the bearer token goes out. Public endpoints
//! (login, refresh) never carry it, and neither do pre-signed storage URLs:
//! those embed their own time-limited authorization and point at a third-party
//! host that must not see the token.

use backoffice_auth::{DEFAULT_PRESIGNED_PATTERNS, DEFAULT_PUBLIC_ENDPOINTS};
use tracing::debug;
use transport::RequestDescriptor;
use transport::header::AUTHORIZATION;

/// Which request targets are exempt from bearer authentication.
///
/// Both lists are matched as substrings of the request URL.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    public_endpoints: Vec<String>,
    presigned_patterns: Vec<String>,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_PUBLIC_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_PRESIGNED_PATTERNS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl AuthPolicy {
    pub fn new(public_endpoints: Vec<String>, presigned_patterns: Vec<String>) -> Self {
        Self {
            public_endpoints,
            presigned_patterns,
        }
    }

    pub fn is_public(&self, url: &str) -> bool {
        self.public_endpoints.iter().any(|e| url.contains(e.as_str()))
    }

    pub fn is_presigned(&self, url: &str) -> bool {
        self.presigned_patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// Whether the target authenticates some other way (or not at all).
    pub fn skips_auth(&self, url: &str) -> bool {
        self.is_public(url) || self.is_presigned(url)
    }

    /// Attach `Authorization: Bearer <access>` unless the target is exempt.
    ///
    /// Exempt requests have any pre-existing Authorization header stripped.
    /// Never fails: without a token the request goes out unauthenticated and
    /// the backend decides. Returns whether a token was attached.
    pub fn attach(&self, request: &mut RequestDescriptor, access: Option<&str>) -> bool {
        if self.skips_auth(&request.url) {
            request.headers.remove(AUTHORIZATION);
            debug!(request_id = %request.id, "auth-exempt target, no bearer attached");
            return false;
        }
        match access {
            Some(token) => request.set_bearer(token),
            None => {
                debug!(request_id = %request.id, "no access token stored, sending unauthenticated");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESIGNED: &str =
        "https://docs-bucket.s3.amazonaws.com/subscription/7/poliza.pdf?X-Amz-Signature=abc";

    #[test]
    fn attaches_bearer_to_protected_paths() {
        let policy = AuthPolicy::default();
        let mut request = RequestDescriptor::get("/user/role");
        assert!(policy.attach(&mut request, Some("A1")));
        assert_eq!(request.bearer(), Some("A1"));
    }

    #[test]
    fn public_endpoints_never_get_bearer() {
        let policy = AuthPolicy::default();
        for url in ["/auth/login", "/auth/refresh_token", "/api/auth/login?next=/"] {
            let mut request = RequestDescriptor::get(url);
            assert!(!policy.attach(&mut request, Some("A1")), "{url}");
            assert!(request.bearer().is_none(), "{url}");
        }
    }

    #[test]
    fn presigned_uploads_never_get_bearer() {
        let policy = AuthPolicy::default();
        let mut request = RequestDescriptor::get(PRESIGNED);
        request.set_bearer("leaked");
        assert!(!policy.attach(&mut request, Some("A1")));
        assert!(request.bearer().is_none(), "existing header must be stripped");
    }

    #[test]
    fn missing_token_is_not_an_error() {
        let policy = AuthPolicy::default();
        let mut request = RequestDescriptor::get("/company");
        assert!(!policy.attach(&mut request, None));
        assert!(request.bearer().is_none());
    }

    #[test]
    fn custom_lists_replace_defaults() {
        let policy = AuthPolicy::new(vec!["/public".into()], vec!["storage.example".into()]);
        assert!(policy.is_public("/public/terms"));
        assert!(!policy.is_public("/auth/login"));
        assert!(policy.is_presigned("https://storage.example/put?sig=1"));
        assert!(!policy.is_presigned(PRESIGNED));
    }
}
