//! Session-expiry notification gate
//!
//! Debounces the "your session has expired" alert: a failed refresh raises
//! the gate, the first alerting caller afterwards gets `true`, everyone else
//! gets `false` until a successful login resets it. Raising again while the
//! alert has already been shown does not re-arm it.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
struct GateState {
    expired: bool,
    notified: bool,
}

#[derive(Debug, Default)]
pub struct SessionExpiryGate {
    state: Mutex<GateState>,
}

impl SessionExpiryGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark the session as expired.
    pub fn raise(&self) {
        let mut state = self.lock();
        state.expired = true;
        debug!(notified = state.notified, "session expiry raised");
    }

    /// Whether the expiry alert should be shown now. True at most once per episode.
    pub fn should_notify(&self) -> bool {
        let mut state = self.lock();
        if state.expired && !state.notified {
            state.notified = true;
            return true;
        }
        false
    }

    pub fn is_expired(&self) -> bool {
        self.lock().expired
    }

    /// Clear both flags. Called after a successful login.
    pub fn reset(&self) {
        *self.lock() = GateState::default();
    }
}
