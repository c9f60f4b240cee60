//! Session pipeline metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls are no-ops.
//!
//! - `session_requests_total` (counter): label `outcome`
//! - `session_refresh_total` (counter): label `outcome`
//! - `session_refresh_waiters_total` (counter)

use crate::classify::Classification;

/// Record one classified exchange (initial send or replay).
pub fn record_request(classification: Classification) {
    metrics::counter!("session_requests_total", "outcome" => classification.label()).increment(1);
}

/// Record a settled refresh episode.
pub fn record_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a caller queued behind an in-flight refresh.
pub fn record_refresh_waiter() {
    metrics::counter!("session_refresh_waiters_total").increment(1);
}
