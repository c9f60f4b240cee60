//! Single-flight refresh coordination
//!
//! State machine with two states:
//! - Idle → Refreshing: the first retryable 401 gets a `Leader` ticket and
//!   issues the refresh call
//! - Refreshing: every later retryable 401 gets a `Follower` ticket, a
//!   oneshot receiver queued behind the leader; no second refresh is issued
//! - Refreshing → Idle: the leader settles, draining the queue exactly once in
//!   insertion order with the same result for every waiter
//!
//! The check-and-set in `begin()` runs under a std Mutex that is never held
//! across an `.await`, so two tasks can never both become leader. If a leader
//! is dropped before settling (its request future was cancelled), its drop
//! settles the episode with `RefreshFailure::Abandoned` so no waiter hangs.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::RefreshFailure;

/// What a settled refresh hands every waiter: the new access token or the failure.
pub type RefreshResult = std::result::Result<Arc<str>, RefreshFailure>;

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Refreshing {
        pending: Vec<oneshot::Sender<RefreshResult>>,
    },
}

/// Owns the refresh state for one client. Created idle, never persisted.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

/// Outcome of `RefreshCoordinator::begin`.
#[derive(Debug)]
pub enum Ticket<'a> {
    /// This caller must perform the refresh and settle it.
    Leader(RefreshLeader<'a>),
    /// A refresh is already in flight; wait for its result.
    Follower(PendingRefresh),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Critical sections never panic midway, so a poisoned lock still
        // holds a consistent state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enter the episode: become leader if idle, otherwise queue as a follower.
    pub fn begin(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if let State::Refreshing { pending } = &mut *state {
            let (tx, rx) = oneshot::channel();
            pending.push(tx);
            crate::metrics::record_refresh_waiter();
            debug!(waiters = pending.len(), "refresh in flight, queued behind it");
            return Ticket::Follower(PendingRefresh { receiver: rx });
        }

        *state = State::Refreshing {
            pending: Vec::new(),
        };
        debug!("refresh episode started");
        Ticket::Leader(RefreshLeader {
            coordinator: self,
            settled: false,
        })
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), State::Refreshing { .. })
    }

    /// Number of callers queued behind the in-flight refresh.
    pub fn pending_len(&self) -> usize {
        match &*self.lock() {
            State::Idle => 0,
            State::Refreshing { pending } => pending.len(),
        }
    }

    /// Return to Idle and deliver `result` to every queued waiter, in order.
    fn settle(&self, result: &RefreshResult) -> usize {
        let pending = match std::mem::take(&mut *self.lock()) {
            State::Idle => Vec::new(),
            State::Refreshing { pending } => pending,
        };
        let count = pending.len();
        for waiter in pending {
            // A waiter whose request was cancelled has dropped its receiver
            let _ = waiter.send(result.clone());
        }
        count
    }
}

/// Exclusive right (and obligation) to perform the in-flight refresh.
#[derive(Debug)]
pub struct RefreshLeader<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLeader<'_> {
    /// Finish the episode. Returns how many waiters were released.
    pub fn settle(mut self, result: RefreshResult) -> usize {
        self.settled = true;
        let released = self.coordinator.settle(&result);
        debug!(
            released,
            success = result.is_ok(),
            "refresh episode settled"
        );
        released
    }
}

impl Drop for RefreshLeader<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let released = self
                .coordinator
                .settle(&Err(RefreshFailure::Abandoned));
            warn!(released, "refresh leader dropped before settling");
        }
    }
}

/// A caller suspended until the in-flight refresh settles.
#[derive(Debug)]
pub struct PendingRefresh {
    receiver: oneshot::Receiver<RefreshResult>,
}

impl PendingRefresh {
    pub async fn wait(self) -> RefreshResult {
        self.receiver
            .await
            .unwrap_or(Err(RefreshFailure::Abandoned))
    }
}
