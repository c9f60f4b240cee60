//! Authenticated transport layer for the back-office client
//!
//! Wraps a raw `Transport` with the session pipeline every service call goes
//! through:
//! 1. `AuthPolicy::attach` adds the bearer token unless the target is a public
//!    endpoint or a pre-signed upload URL
//! 2. The raw transport sends the request
//! 3. `classify` sorts the outcome into success, retryable 401, terminal 401,
//!    or other failure
//! 4. A retryable 401 enters the `RefreshCoordinator`: the first caller
//!    refreshes, everyone arriving meanwhile waits, and all replay once with
//!    the new token
//! 5. A failed refresh wipes the session, raises the `SessionExpiryGate`, and
//!    asks the `Navigator` to show the sign-in entry point
//!
//! Callers only see `SessionClient::request`; the refresh mechanics never leak.

pub mod classify;
pub mod client;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod message;
pub mod metrics;
pub mod navigation;
pub mod policy;

#[cfg(test)]
mod testing;

pub use classify::{Classification, classify};
pub use client::SessionClient;
pub use coordinator::{PendingRefresh, RefreshCoordinator, RefreshLeader, Ticket};
pub use error::{Error, RefreshFailure, Result};
pub use gate::SessionExpiryGate;
pub use message::{Alert, DEFAULT_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE, error_message};
pub use navigation::Navigator;
pub use policy::AuthPolicy;
