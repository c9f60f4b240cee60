//! In-memory backend and navigator used by the pipeline tests

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use backoffice_auth::{CredentialPair, Scope, SessionStore};
use tokio::sync::Notify;
use transport::{RequestDescriptor, Response, Transport, TransportError};

use crate::client::SessionClient;
use crate::navigation::Navigator;
use crate::policy::AuthPolicy;

/// How the fake refresh endpoint behaves.
#[derive(Debug, Clone)]
pub enum RefreshMode {
    /// Issue this pair and start accepting its access token
    Issue { access: String, refresh: String },
    /// Issue this pair but keep rejecting it (backend never honors it)
    IssueIgnored { access: String, refresh: String },
    /// Answer with this status
    Reject(u16),
    /// No response at all
    NetworkDown,
}

struct BackendState {
    valid_access: String,
    refresh_mode: RefreshMode,
}

/// Scripted backend:
/// - `/auth/login` issues A1/R1 (401 when the password is "wrong")
/// - `/auth/refresh_token` follows `RefreshMode`, optionally held on a `Notify`
/// - `/slow` is protected; the first one may be held on a `Notify`
/// - `/boom` answers 500 with a backend message
/// - `/offline` fails at the transport level
/// - pre-signed URLs answer 200, or 401 when they contain "expired"
/// - anything else is protected: 200 for the valid token, 401 otherwise
pub struct FakeBackend {
    state: Mutex<BackendState>,
    refresh_hold: Option<Arc<Notify>>,
    slow_hold: Mutex<Option<Arc<Notify>>>,
    refresh_calls: AtomicUsize,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl FakeBackend {
    pub fn new(valid_access: &str, refresh_mode: RefreshMode) -> Self {
        Self {
            state: Mutex::new(BackendState {
                valid_access: valid_access.to_string(),
                refresh_mode,
            }),
            refresh_hold: None,
            slow_hold: Mutex::new(None),
            refresh_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Make refresh calls wait until the returned `Notify` is signalled.
    pub fn hold_refresh(mut self) -> (Self, Arc<Notify>) {
        let hold = Arc::new(Notify::new());
        self.refresh_hold = Some(hold.clone());
        (self, hold)
    }

    /// Make the next `/slow` request wait until the returned `Notify` is
    /// signalled. Its token is checked after the wait.
    pub fn hold_slow(self) -> (Self, Arc<Notify>) {
        let hold = Arc::new(Notify::new());
        *self.slow_hold.lock().unwrap() = Some(hold.clone());
        (self, hold)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Recorded requests whose URL contains `fragment`.
    pub fn seen_matching(&self, fragment: &str) -> Vec<RequestDescriptor> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .cloned()
            .collect()
    }

    fn tokens(access: &str, refresh: &str) -> Response {
        Response::json(
            200,
            &serde_json::json!({
                "data": {
                    "accessToken": access,
                    "refreshToken": refresh,
                    "accesTokenExpiresIn": 900,
                    "refreshTokenExpiresIn": 86400,
                    "user": {"name": "Ana", "role": {"id": backoffice_auth::roles::ADMIN_ROLE_ID}}
                }
            }),
        )
    }

    async fn refresh(&self) -> transport::Result<Response> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.refresh_hold {
            hold.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        match state.refresh_mode.clone() {
            RefreshMode::Issue { access, refresh } => {
                state.valid_access = access.clone();
                Ok(Self::tokens(&access, &refresh))
            }
            RefreshMode::IssueIgnored { access, refresh } => Ok(Self::tokens(&access, &refresh)),
            RefreshMode::Reject(status) => Ok(Response::json(
                status,
                &serde_json::json!({"message": "refresh token expired"}),
            )),
            RefreshMode::NetworkDown => Err(TransportError::Connect("connection refused".into())),
        }
    }

    fn protected(&self, request: &RequestDescriptor) -> Response {
        let valid = self.state.lock().unwrap().valid_access.clone();
        match request.bearer() {
            Some(token) if token == valid => Response::json(
                200,
                &serde_json::json!({"data": {"url": request.url, "token": token}}),
            ),
            _ => Response::json(401, &serde_json::json!({"message": "Unauthorized"})),
        }
    }
}

impl Transport for FakeBackend {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = transport::Result<Response>> + Send + 'a>> {
        self.seen.lock().unwrap().push(request.clone());
        Box::pin(async move {
            let url = request.url.as_str();
            if url.contains("/auth/refresh_token") {
                return self.refresh().await;
            }
            if url.contains("/auth/login") {
                let body = request.body.as_deref().unwrap_or_default();
                if String::from_utf8_lossy(body).contains("wrong") {
                    return Ok(Response::json(
                        401,
                        &serde_json::json!({"message": "Credenciales inválidas"}),
                    ));
                }
                return Ok(Self::tokens("A1", "R1"));
            }
            if url.contains("s3.amazonaws.com") {
                let status = if url.contains("expired") { 401 } else { 200 };
                return Ok(Response::new(status, ""));
            }
            if url.contains("/boom") {
                return Ok(Response::json(
                    500,
                    &serde_json::json!({"message": "Concepto no encontrado"}),
                ));
            }
            if url.contains("/slow") {
                let hold = self.slow_hold.lock().unwrap().take();
                if let Some(hold) = hold {
                    hold.notified().await;
                }
                return Ok(self.protected(request));
            }
            if url.contains("/offline") {
                return Err(TransportError::Connect("connection refused".into()));
            }
            Ok(self.protected(request))
        })
    }
}

#[derive(Debug, Default)]
pub struct CountingNavigator {
    calls: AtomicUsize,
}

impl CountingNavigator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn navigate_to_sign_in(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn pair(access: &str, refresh: &str) -> CredentialPair {
    CredentialPair {
        access: access.into(),
        refresh: refresh.into(),
        access_expires: 4_102_444_800_000,
        refresh_expires: 4_102_444_800_000,
    }
}

/// A client over `backend` with an empty session store in `dir`.
pub async fn client(
    backend: Arc<FakeBackend>,
    dir: &tempfile::TempDir,
) -> (SessionClient, Arc<CountingNavigator>) {
    let store = SessionStore::load(dir.path().join("session.json"))
        .await
        .unwrap();
    let navigator = Arc::new(CountingNavigator::default());
    let client = SessionClient::new(
        backend,
        Arc::new(store),
        AuthPolicy::default(),
        navigator.clone(),
    );
    (client, navigator)
}

/// Same as `client`, with `access`/`refresh` already stored durably.
pub async fn signed_in_client(
    backend: Arc<FakeBackend>,
    dir: &tempfile::TempDir,
    access: &str,
    refresh: &str,
) -> (SessionClient, Arc<CountingNavigator>) {
    let (client, navigator) = client(backend, dir).await;
    client
        .store()
        .store_login(&pair(access, refresh), None, Scope::Durable)
        .await
        .unwrap();
    (client, navigator)
}
