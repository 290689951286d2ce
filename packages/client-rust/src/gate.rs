//! Session gate in front of the record UI.
//!
//! Blocks while the session is loading, redirects to the sign-in view when
//! there is no session, and remembers where the user was headed so sign-in
//! can send them back.

use std::sync::Arc;

use crate::session::{Session, SessionService, SessionState};

/// Default sign-in route.
pub const SIGN_IN_PATH: &str = "/login";

/// Route used after sign-in when no origin was recorded.
pub const HOME_PATH: &str = "/";

/// What the gate decided for a requested location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session state is still loading; render a loading indicator.
    Loading,
    /// No session; go to `to`, returning to `from` after sign-in.
    Redirect { to: String, from: String },
    /// A session exists; render the protected view.
    Allow(Session),
}

/// Gate over a shared [`SessionService`].
pub struct SessionGate {
    session: Arc<SessionService>,
    sign_in_path: String,
}

impl SessionGate {
    #[must_use]
    pub fn new(session: Arc<SessionService>) -> Self {
        Self {
            session,
            sign_in_path: SIGN_IN_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Decision for `location` given the current session state.
    #[must_use]
    pub fn decide(&self, location: &str) -> GateDecision {
        self.decision_for(&self.session.state(), location)
    }

    /// Waits out the loading state, then decides.
    pub async fn wait(&self, location: &str) -> GateDecision {
        let state = self.session.resolved().await;
        self.decision_for(&state, location)
    }

    /// Where to go after a successful sign-in. Falls back to the home route
    /// when no origin was recorded or the origin is this gate's sign-in page.
    #[must_use]
    pub fn return_location<'a>(&self, from: Option<&'a str>) -> &'a str {
        match from {
            Some(path) if !path.is_empty() && path != self.sign_in_path => path,
            _ => HOME_PATH,
        }
    }

    fn decision_for(&self, state: &SessionState, location: &str) -> GateDecision {
        match state {
            SessionState::Loading => GateDecision::Loading,
            SessionState::SignedOut => GateDecision::Redirect {
                to: self.sign_in_path.clone(),
                from: location.to_string(),
            },
            SessionState::SignedIn(session) => GateDecision::Allow(session.clone()),
        }
    }
}
