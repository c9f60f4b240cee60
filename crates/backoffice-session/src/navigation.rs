//! Navigation side effect for terminal refresh failures

/// Sends the user back to the sign-in entry point.
///
/// Invoked exactly once per failed refresh, after the session was cleared.
pub trait Navigator: Send + Sync {
    fn navigate_to_sign_in(&self);
}
