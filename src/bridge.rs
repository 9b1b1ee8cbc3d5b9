//! Session bridge: mirrors backend auth state into observable local state
//! and exposes the user-facing auth operations.
//!
//! ARCHITECTURE
//! ============
//! Mounting registers an event subscription, then resolves the current
//! session once. The subscription handler is the only writer of
//! [`AuthState`] after that; it holds the state sender and navigator
//! directly (not the bridge), so dropping the bridge drops the subscription.
//!
//! ERROR HANDLING
//! ==============
//! Sign-up, sign-in, the backend sign-out call, and OAuth initiation fail
//! the operation with [`AuthError`]. Sign-out's storage purge and token
//! revocation are best-effort and only logged.

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error};

use crate::backend::{AuthBackend, OAuthOptions};
use crate::config::{APP_ROOT, GOOGLE_TOKEN_KEY, SIGN_OUT_ALERT, is_backend_key};
use crate::error::{AuthError, StorageError};
use crate::events::Subscription;
use crate::platform::{KeyValueStore, Navigator, Platform, Severity};
use crate::state::AuthState;
use crate::types::{AuthEvent, AuthEventKind, AuthResponse, OAuthResponse, User};

pub const GOOGLE_PROVIDER: &str = "google";
pub const SIGN_OUT_FAILED_MESSAGE: &str = "Sign out failed. Please try again.";

pub struct SessionBridge {
    backend: Arc<dyn AuthBackend>,
    platform: Platform,
    state: Arc<watch::Sender<AuthState>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionBridge {
    /// Subscribe to auth events, then resolve the initial session.
    /// A failed lookup is treated as "no session".
    pub async fn mount(backend: Arc<dyn AuthBackend>, platform: Platform) -> Arc<Self> {
        let (tx, _) = watch::channel(AuthState::default());
        let state = Arc::new(tx);
        let subscription = subscribe(backend.as_ref(), platform.navigator.clone(), state.clone());

        let session = match backend.get_session().await {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "initial session lookup failed");
                None
            }
        };
        state.send_if_modified(|s| s.apply_initial(session.as_ref()));

        Arc::new(Self { backend, platform, state, subscription: Mutex::new(Some(subscription)) })
    }

    /// Release the event subscription. Later calls are no-ops.
    pub fn unmount(&self) {
        let subscription = self.subscription.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.subscription.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    // =========================================================================
    // STATE
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`AuthError::Backend`] with the backend's message, or
    /// `"Signup failed"` when it sent none.
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<AuthResponse, AuthError> {
        self.backend.sign_up(email, password, username).await.map_err(|e| {
            error!(error = %e, "signup failed");
            AuthError::from_backend(&e, "Signup failed")
        })
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Backend`] with the backend's message, or
    /// `"Login failed"` when it sent none.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        self.backend.sign_in_with_password(email, password).await.map_err(|e| {
            error!(error = %e, "login failed");
            AuthError::from_backend(&e, "Login failed")
        })
    }

    /// End the session, purge backend keys from both stores, revoke a
    /// stored Google token, and return to the app root.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Backend`] if the backend refuses to sign out.
    /// In that case a transient alert is raised, storage is untouched, and
    /// no redirect happens.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Err(e) = self.backend.sign_out().await {
            let err = AuthError::from_backend(&e, "Signout failed");
            error!(error = %err, "sign out failed");
            self.platform.notifier.notify(SIGN_OUT_FAILED_MESSAGE, Severity::Error, SIGN_OUT_ALERT);
            return Err(err);
        }

        for (name, store) in [("local", &self.platform.local_store), ("session", &self.platform.session_store)] {
            match purge_backend_keys(store.as_ref()) {
                Ok(removed) => debug!(store = name, removed, "auth storage cleared"),
                Err(e) => debug!(store = name, error = %e, "storage cleanup failed"),
            }
        }

        let token = stored_google_token(self.platform.local_store.as_ref())
            .or_else(|| stored_google_token(self.platform.session_store.as_ref()));
        if let Some(token) = token {
            self.platform.revoker.revoke(&token);
        }

        self.platform.navigator.redirect(APP_ROOT);
        Ok(())
    }

    /// Start Google OAuth with an account chooser, returning to the app root.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Backend`] with the backend's message, or
    /// `"Google sign-in failed"` when it sent none.
    pub async fn sign_in_with_google(&self) -> Result<OAuthResponse, AuthError> {
        let options = OAuthOptions {
            redirect_to: Some(format!("{}{APP_ROOT}", self.platform.navigator.origin())),
            query_params: vec![("prompt".to_owned(), "select_account".to_owned())],
            scopes: None,
        };
        let resp = self
            .backend
            .sign_in_with_oauth(GOOGLE_PROVIDER, options)
            .await
            .map_err(|e| {
                error!(error = %e, "google oauth failed");
                AuthError::from_backend(&e, "Google sign-in failed")
            })?;
        self.platform.navigator.redirect(&resp.url);
        Ok(resp)
    }
}

fn subscribe(
    backend: &dyn AuthBackend,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<AuthState>>,
) -> Subscription {
    Subscription::spawn(backend.subscribe(), move |event: AuthEvent| {
        apply_event(&event, navigator.as_ref(), &state);
        std::future::ready(())
    })
}

fn apply_event(event: &AuthEvent, navigator: &dyn Navigator, state: &watch::Sender<AuthState>) {
    debug!(event = %event.kind, has_user = event.user().is_some(), "auth state change");
    state.send_if_modified(|s| s.apply_event(event.session.as_ref()));
    if event.kind == AuthEventKind::SignedIn && event.user().is_some() && navigator.pathname() != APP_ROOT {
        navigator.redirect(APP_ROOT);
    }
}

/// Remove every backend-owned key from `store`. Returns how many were removed.
///
/// # Errors
///
/// Returns the first [`StorageError`]; keys before it stay removed.
pub fn purge_backend_keys(store: &dyn KeyValueStore) -> Result<usize, StorageError> {
    let mut removed = 0;
    for key in store.keys()?.into_iter().filter(|k| is_backend_key(k)) {
        store.remove_item(&key)?;
        removed += 1;
    }
    Ok(removed)
}

fn stored_google_token(store: &dyn KeyValueStore) -> Option<String> {
    match store.get_item(GOOGLE_TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            debug!(error = %e, "google token lookup failed");
            None
        }
    }
}
