//! Session-aware client: the full request pipeline
//!
//! `SessionClient::request` is the only entry point service calls use. It
//! attaches the bearer token, sends, classifies, and on a retryable 401 joins
//! the refresh episode before replaying the request once with the new token.

use std::sync::Arc;

use backoffice_auth::{Scope, SessionStore, SessionUser, now_millis};
use common::Secret;
use tracing::{debug, info, instrument, warn};
use transport::{Bytes, HeaderValue, RequestDescriptor, Response, Transport, header};

use crate::classify::{Classification, classify};
use crate::coordinator::{RefreshCoordinator, RefreshResult, Ticket};
use crate::error::{Error, RefreshFailure, Result};
use crate::gate::SessionExpiryGate;
use crate::metrics;
use crate::navigation::Navigator;
use crate::policy::AuthPolicy;

/// Outcome of one send.
enum Dispatch {
    Done(Result<Response>),
    /// 401 that a refresh may fix
    NeedsRefresh(Response),
}

pub struct SessionClient {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    policy: AuthPolicy,
    coordinator: RefreshCoordinator,
    gate: Arc<SessionExpiryGate>,
    navigator: Arc<dyn Navigator>,
}

impl SessionClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<SessionStore>,
        policy: AuthPolicy,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            store,
            policy,
            coordinator: RefreshCoordinator::new(),
            gate: Arc::new(SessionExpiryGate::new()),
            navigator,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Shared with the alerting layer so it can debounce the expiry alert.
    pub fn expiry_gate(&self) -> Arc<SessionExpiryGate> {
        self.gate.clone()
    }

    /// Send `request` through the session pipeline.
    ///
    /// Resolves with the 2xx response, or with an error once the request
    /// cannot succeed: a non-401 failure, a 401 that cannot be recovered, or
    /// a failed refresh. A request is replayed at most once.
    #[instrument(skip_all, fields(request_id = %request.id, method = %request.method, url = %request.url))]
    pub async fn request(&self, mut request: RequestDescriptor) -> Result<Response> {
        let access = self.store.access_token().await;
        self.policy.attach(&mut request, access.as_deref());

        match self.dispatch(&request).await {
            Dispatch::Done(result) => result,
            Dispatch::NeedsRefresh(_) => self.recover(request).await,
        }
    }

    /// PUT a file to a pre-signed storage URL. Never carries the bearer token.
    pub async fn upload_presigned(
        &self,
        url: &str,
        body: Bytes,
        content_type: HeaderValue,
    ) -> Result<Response> {
        if !self.policy.is_presigned(url) {
            warn!(url, "upload target does not match any pre-signed pattern");
        }
        self.request(RequestDescriptor::put_bytes(url, body, content_type))
            .await
    }

    async fn dispatch(&self, request: &RequestDescriptor) -> Dispatch {
        let result = self.transport.send(request).await;
        let classification = classify(&self.policy, request, &result);
        metrics::record_request(classification);
        debug!(outcome = classification.label(), "request classified");

        match (classification, result) {
            (Classification::Success, Ok(response)) => Dispatch::Done(Ok(response)),
            (Classification::AuthRetryable, Ok(response)) => Dispatch::NeedsRefresh(response),
            (Classification::AuthTerminal, Ok(response)) => {
                Dispatch::Done(Err(Error::AuthTerminal {
                    status: response.status,
                    body: response.text(),
                }))
            }
            (_, Ok(response)) => Dispatch::Done(Err(Error::Server {
                status: response.status,
                body: response.text(),
            })),
            (_, Err(e)) => Dispatch::Done(Err(Error::Network(e))),
        }
    }

    /// Join the refresh episode, then replay once with the new token.
    ///
    /// A 401 for a token that has already been replaced (the response raced
    /// a finished refresh) is replayed with the stored token directly.
    async fn recover(&self, mut request: RequestDescriptor) -> Result<Response> {
        request.mark_retried();

        let stored = self.store.access_token().await;
        let token: Arc<str> = match stored {
            Some(current) if request.bearer() != Some(current.as_str()) => {
                debug!("token already refreshed, skipping refresh");
                Arc::from(current.as_str())
            }
            _ => match self.coordinator.begin() {
                Ticket::Leader(leader) => {
                    let result = self.refresh_session().await;
                    leader.settle(result.clone());
                    result?
                }
                Ticket::Follower(pending) => pending.wait().await?,
            },
        };

        // Never replay with the token that was just rejected
        if !request.set_bearer(&token) {
            request.headers.remove(header::AUTHORIZATION);
        }
        debug!("replaying with refreshed token");
        match self.dispatch(&request).await {
            Dispatch::Done(result) => result,
            // Classification never yields a retryable 401 for a replay
            Dispatch::NeedsRefresh(response) => Err(Error::AuthTerminal {
                status: response.status,
                body: response.text(),
            }),
        }
    }

    /// Run the refresh as leader. On failure, end the session: wipe the
    /// store, raise the expiry gate, and navigate to sign-in exactly once.
    async fn refresh_session(&self) -> RefreshResult {
        let result = self.perform_refresh().await;
        metrics::record_refresh(result.is_ok());

        if let Err(failure) = &result {
            warn!(error = %failure, "token refresh failed, ending session");
            if let Err(e) = self.store.clear().await {
                warn!(error = %e, "failed to clear session after refresh failure");
            }
            self.gate.raise();
            self.navigator.navigate_to_sign_in();
        }
        result
    }

    async fn perform_refresh(&self) -> RefreshResult {
        let refresh = self
            .store
            .refresh_token()
            .await
            .ok_or(RefreshFailure::MissingCredential)?;

        let tokens = backoffice_auth::refresh_token(self.transport.as_ref(), &refresh).await?;
        let pair = tokens.into_credentials(now_millis());
        if HeaderValue::from_str(&format!("Bearer {}", pair.access)).is_err() {
            return Err(RefreshFailure::InvalidResponse(
                "refreshed access token is not a valid header value".into(),
            ));
        }

        // Callers already hold the new token; losing it on disk only costs a
        // sign-in on the next start.
        match self.store.replace_credentials(&pair).await {
            Ok(scope) => info!(scope = scope.label(), "token refresh succeeded"),
            Err(e) => warn!(error = %e, "failed to persist refreshed token"),
        }
        Ok(Arc::from(pair.access.as_str()))
    }

    /// Sign in and store the session. `remember` keeps it across restarts.
    ///
    /// Resets the expiry gate, so the next failed refresh alerts again.
    pub async fn login(
        &self,
        username: &str,
        password: &Secret<String>,
        remember: bool,
    ) -> Result<Option<SessionUser>> {
        let response = backoffice_auth::login(self.transport.as_ref(), username, password)
            .await
            .map_err(Error::from_login)?;

        let user = response.user;
        let pair = response.tokens.into_credentials(now_millis());
        let scope = if remember {
            Scope::Durable
        } else {
            Scope::Volatile
        };
        self.store
            .store_login(&pair, user.as_ref(), scope)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        self.gate.reset();
        info!(username, scope = scope.label(), "signed in");
        Ok(self.store.user().await)
    }

    /// Forget the session in both scopes.
    pub async fn logout(&self) -> Result<()> {
        self.store
            .clear()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        info!("signed out");
        Ok(())
    }

    pub async fn is_signed_in(&self) -> bool {
        self.store.is_signed_in().await
    }
}
