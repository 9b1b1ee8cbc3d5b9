//! Wire types shared with the hosted auth backend, and the local user
//! projection derived from them.
//!
//! DESIGN
//! ======
//! `Session` and `SessionUser` mirror the backend's JSON so they round-trip
//! losslessly; unknown fields ride along in `extra`. The only interpretation
//! this crate performs is [`User::from_session`].

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// SESSION
// =============================================================================

/// The backend's user object attached to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionUser {
    /// `user_metadata.username`, when present as a string.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user_metadata.get("username").and_then(Value::as_str)
    }
}

/// Backend-issued session. Opaque to this crate apart from `user`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

// =============================================================================
// USER
// =============================================================================

/// Local user-presence record. Only ever built from a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    /// Project a session onto a local user. `None` when there is no session
    /// or the session carries no user.
    #[must_use]
    pub fn from_session(session: Option<&Session>) -> Option<Self> {
        let user = session?.user.as_ref()?;
        Some(Self {
            id: user.id.clone(),
            email: user.email.clone().unwrap_or_default(),
            username: user.username().map(str::to_owned),
        })
    }
}

// =============================================================================
// AUTH EVENTS
// =============================================================================

/// Kind of a backend-pushed auth event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
    /// A kind this crate does not interpret.
    Other(String),
}

impl AuthEventKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
            Self::PasswordRecovery => "PASSWORD_RECOVERY",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for AuthEventKind {
    fn from(raw: &str) -> Self {
        match raw {
            "INITIAL_SESSION" => Self::InitialSession,
            "SIGNED_IN" => Self::SignedIn,
            "SIGNED_OUT" => Self::SignedOut,
            "TOKEN_REFRESHED" => Self::TokenRefreshed,
            "USER_UPDATED" => Self::UserUpdated,
            "PASSWORD_RECOVERY" => Self::PasswordRecovery,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for AuthEventKind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<AuthEventKind> for String {
    fn from(kind: AuthEventKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session lifecycle notification pushed by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    #[must_use]
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    /// The session's user, if the event carries one.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().and_then(|s| s.user.as_ref())
    }
}

// =============================================================================
// OPERATION RESULTS
// =============================================================================

/// Raw result of a sign-up or password sign-in.
///
/// `session` is `None` after a sign-up that still awaits email confirmation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: Option<SessionUser>,
    pub session: Option<Session>,
}

/// Result of starting an OAuth flow: the provider and the authorize URL
/// the browser must be sent to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthResponse {
    pub provider: String,
    pub url: String,
}
