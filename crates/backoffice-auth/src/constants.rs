//! Back-office backend endpoints and storage keys
//!
//! Storage key spellings match what the web client persisted, including the
//! `accesTokenExpiresIn` typo, so an existing session file stays readable.

/// Login endpoint (public, never carries a bearer token)
pub const LOGIN_PATH: &str = "/auth/login";

/// Refresh endpoint; the refresh token travels as a query parameter
pub const REFRESH_PATH: &str = "/auth/refresh_token";

pub const REFRESH_QUERY_PARAM: &str = "refresh_token";

/// Endpoints that must never receive a bearer token and whose 401s must not
/// trigger a refresh. Matched as substrings of the request URL.
pub const DEFAULT_PUBLIC_ENDPOINTS: &[&str] = &["/auth/login", "/auth/refresh"];

/// URL fragments identifying pre-signed object storage uploads.
pub const DEFAULT_PRESIGNED_PATTERNS: &[&str] = &["bucket", "s3.amazonaws.com"];

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const ACCESS_EXPIRES_KEY: &str = "accesTokenExpiresIn";
pub const REFRESH_EXPIRES_KEY: &str = "refreshTokenExpiresIn";
pub const USER_KEY: &str = "user";

/// Every key owned by a session; all are removed on logout.
pub const SESSION_KEYS: &[&str] = &[
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    ACCESS_EXPIRES_KEY,
    REFRESH_EXPIRES_KEY,
    USER_KEY,
];
