//! Contracts consumed from the hosted auth and data backend.
//!
//! DESIGN
//! ======
//! The core only ever talks to these traits. `HttpBackend` implements them
//! against a Supabase-compatible REST API; tests substitute in-memory mocks.
//! Browser builds drop the `Send` requirement on the returned futures, since
//! fetch-backed requests are tied to the page's thread.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::BackendError;
use crate::types::{AuthEvent, AuthResponse, OAuthResponse, Session};

pub use http::HttpBackend;

/// Options for starting an OAuth sign-in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OAuthOptions {
    /// Where the provider should send the browser after consent.
    pub redirect_to: Option<String>,
    /// Extra query parameters forwarded to the provider (e.g. `prompt`).
    pub query_params: Vec<(String, String)>,
    pub scopes: Option<String>,
}

/// How much of the upserted row the backend should echo back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Returning {
    #[default]
    Minimal,
    Representation,
}

impl Returning {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Representation => "representation",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Conflict target column(s); the table's primary key when `None`.
    pub on_conflict: Option<String>,
    pub returning: Returning,
}

/// Auth half of the backend SDK.
#[cfg_attr(all(target_arch = "wasm32", feature = "hydrate"), async_trait(?Send))]
#[cfg_attr(not(all(target_arch = "wasm32", feature = "hydrate")), async_trait)]
pub trait AuthBackend: Send + Sync {
    /// Current session, if one is stored.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the session cannot be read.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Receiver for every auth event published after this call.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Register a new account; `username` is stored as user metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] carrying the backend's message on rejection.
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<AuthResponse, BackendError>;

    /// # Errors
    ///
    /// Returns a [`BackendError`] carrying the backend's message on rejection.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError>;

    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend refuses to end the session.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Start an OAuth flow; returns the authorize URL to send the browser to.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the flow cannot be started.
    async fn sign_in_with_oauth(&self, provider: &str, options: OAuthOptions) -> Result<OAuthResponse, BackendError>;

    /// Whether [`AuthBackend::get_session_from_url`] is implemented.
    fn supports_session_from_url(&self) -> bool {
        false
    }

    /// Finish an OAuth redirect by reading tokens out of `url`.
    /// `Ok(None)` means the URL carried no tokens.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unsupported`] unless overridden, or a
    /// [`BackendError`] when the redirect carried an error or the tokens
    /// were rejected.
    async fn get_session_from_url(&self, url: &str, store_session: bool) -> Result<Option<Session>, BackendError> {
        let _ = (url, store_session);
        Err(BackendError::Unsupported("get_session_from_url"))
    }
}

/// Data half of the backend SDK.
#[cfg_attr(all(target_arch = "wasm32", feature = "hydrate"), async_trait(?Send))]
#[cfg_attr(not(all(target_arch = "wasm32", feature = "hydrate")), async_trait)]
pub trait DataBackend: Send + Sync {
    /// Insert-or-update `row` in `table`. Returns the stored rows when
    /// `options.returning` asks for them.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend rejects the write.
    async fn upsert(&self, table: &str, row: Value, options: UpsertOptions) -> Result<Option<Value>, BackendError>;
}
