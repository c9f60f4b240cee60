//! Back-office account authentication library
//!
//! Provides the credential store (durable + volatile scopes), the login and
//! refresh endpoint calls, and the signed-in user's role helpers. This crate
//! knows nothing about request interception; the session pipeline in
//! `backoffice-session` builds on it.
//!
//! Credential flow:
//! 1. Caller logs in via `token::login()` with "remember me" on or off
//! 2. Pair + user stored via `SessionStore::store_login()` in the chosen scope
//! 3. Session pipeline reads `SessionStore::access_token()` per request
//! 4. On a 401 the pipeline calls `token::refresh_token()` once
//! 5. New pair saved via `SessionStore::replace_credentials()`
//! 6. Logout or failed refresh wipes both scopes via `SessionStore::clear()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod roles;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialPair, Scope, SessionStore};
pub use error::{Error, Result};
pub use roles::{Role, SessionUser};
pub use token::{LoginResponse, TokenResponse, login, now_millis, refresh_token};
