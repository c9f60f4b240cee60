//! Login and token refresh against the back-office backend
//!
//! Both calls go straight to the raw `Transport`: they hit public endpoints,
//! so they must never pass through the session pipeline that would attach a
//! bearer token or recurse into another refresh.
//!
//! The backend wraps every payload in `{"data": ...}`. Expirations arrive as
//! seconds deltas; callers convert them with `TokenResponse::into_credentials`.

use common::Secret;
use serde::{Deserialize, Deserializer, Serialize};
use transport::{RequestDescriptor, Transport};

use crate::constants::{LOGIN_PATH, REFRESH_PATH, REFRESH_QUERY_PARAM};
use crate::credentials::CredentialPair;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Token payload shared by login and refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    #[serde(
        rename = "accesTokenExpiresIn",
        alias = "accessTokenExpiresIn",
        deserialize_with = "seconds"
    )]
    pub access_expires_in: u64,
    /// Seconds until the refresh token expires
    #[serde(deserialize_with = "seconds")]
    pub refresh_token_expires_in: u64,
}

impl TokenResponse {
    /// Convert the deltas to absolute unix-millisecond expirations.
    ///
    /// Saturates at `u64::MAX` for deltas too large to represent.
    pub fn into_credentials(self, now_millis: u64) -> CredentialPair {
        CredentialPair {
            access: self.access_token,
            refresh: self.refresh_token,
            access_expires: expires_at(now_millis, self.access_expires_in),
            refresh_expires: expires_at(now_millis, self.refresh_token_expires_in),
        }
    }
}

fn expires_at(now_millis: u64, seconds: u64) -> u64 {
    now_millis.saturating_add(seconds.saturating_mul(1000))
}

/// Login payload: tokens plus the user's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

/// Accepts `3600` or `"3600"`; the backend has shipped both.
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Exchange a username and password for a credential pair.
pub async fn login(
    transport: &dyn Transport,
    username: &str,
    password: &Secret<String>,
) -> Result<LoginResponse> {
    let request = RequestDescriptor::post_json(
        LOGIN_PATH,
        &serde_json::json!({
            "username": username,
            "password": password.expose(),
        }),
    )
    .map_err(|e| Error::Http(format!("building login request: {e}")))?;

    let response = transport
        .send(&request)
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    if !response.is_success() {
        let body = response.text();
        if response.status == 401 || response.status == 403 {
            return Err(Error::Rejected {
                status: response.status,
                body,
            });
        }
        return Err(Error::Endpoint {
            status: response.status,
            body,
        });
    }

    response
        .parse::<Envelope<LoginResponse>>()
        .map(|envelope| envelope.data)
        .map_err(|e| Error::InvalidResponse(format!("invalid login response: {e}")))
}

/// Exchange a refresh token for a new credential pair.
///
/// 401/403 mean the refresh token is expired or revoked.
pub async fn refresh_token(transport: &dyn Transport, refresh: &str) -> Result<TokenResponse> {
    let request = RequestDescriptor::post_json(REFRESH_PATH, &serde_json::json!({}))
        .map_err(|e| Error::Http(format!("building refresh request: {e}")))?
        .with_query(REFRESH_QUERY_PARAM, refresh);

    let response = transport
        .send(&request)
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    if !response.is_success() {
        let body = response.text();
        if response.status == 401 || response.status == 403 {
            return Err(Error::Rejected {
                status: response.status,
                body,
            });
        }
        return Err(Error::Endpoint {
            status: response.status,
            body,
        });
    }

    response
        .parse::<Envelope<TokenResponse>>()
        .map(|envelope| envelope.data)
        .map_err(|e| Error::InvalidResponse(format!("invalid refresh response: {e}")))
}
