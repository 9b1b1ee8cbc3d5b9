//! Observable auth state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session bridge owns the only writer; UI code and route guards read
//! snapshots or watch for changes. State is a pure projection of backend
//! events and never transitions on its own.

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

use serde::Serialize;

use crate::types::{Session, User};

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

impl Default for AuthState {
    /// Nothing is known until the initial session lookup resolves.
    fn default() -> Self {
        Self { user: None, loading: true }
    }
}

/// Conceptual lifecycle derived from [`AuthState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AuthPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthState {
    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Authenticating
        } else if self.user.is_some() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Unauthenticated
        }
    }

    /// Apply the result of the initial session lookup. A missing user leaves
    /// any user set by an earlier event in place. Returns whether anything
    /// changed.
    pub fn apply_initial(&mut self, session: Option<&Session>) -> bool {
        let mut changed = false;
        if let Some(user) = User::from_session(session) {
            changed |= self.user.as_ref() != Some(&user);
            self.user = Some(user);
        }
        changed | self.finish_loading()
    }

    /// Apply a backend event's session: set the user from it or clear it.
    /// Returns whether anything changed.
    pub fn apply_event(&mut self, session: Option<&Session>) -> bool {
        let user = User::from_session(session);
        let changed = self.user != user;
        self.user = user;
        changed | self.finish_loading()
    }

    /// Returns `true` only on the transition from loading to loaded.
    fn finish_loading(&mut self) -> bool {
        std::mem::replace(&mut self.loading, false)
    }
}

/// Whether a route guard should send the visitor to a sign-in page.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}
