//! Scoped provisioning of the auth context.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthProvider` mounts a [`SessionBridge`] and makes it reachable through
//! [`use_auth`] for code running inside [`AuthProvider::scope`]. Outside a
//! scope the accessor always fails; it never hands back a default context.
//!
//! The scope is task-local: futures passed to `tokio::spawn` inside a scope
//! do not inherit it and must be wrapped in their own scope.

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use crate::backend::AuthBackend;
use crate::bridge::SessionBridge;
use crate::error::AuthError;
use crate::platform::Platform;

tokio::task_local! {
    static CURRENT_AUTH: AuthContext;
}

/// Cloneable handle exposing `{user, loading, sign_up, sign_in, sign_out,
/// sign_in_with_google}` of a mounted bridge.
#[derive(Clone)]
pub struct AuthContext {
    bridge: Arc<SessionBridge>,
}

impl AuthContext {
    #[must_use]
    pub fn new(bridge: Arc<SessionBridge>) -> Self {
        Self { bridge }
    }
}

impl Deref for AuthContext {
    type Target = SessionBridge;

    fn deref(&self) -> &SessionBridge {
        &self.bridge
    }
}

/// Owns a mounted bridge for its lifetime; dropping it unmounts.
pub struct AuthProvider {
    context: AuthContext,
}

impl AuthProvider {
    pub async fn mount(backend: Arc<dyn AuthBackend>, platform: Platform) -> Self {
        let bridge = SessionBridge::mount(backend, platform).await;
        Self { context: AuthContext::new(bridge) }
    }

    #[must_use]
    pub fn context(&self) -> AuthContext {
        self.context.clone()
    }

    /// Run `fut` with this provider's context visible to [`use_auth`].
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        CURRENT_AUTH.scope(self.context.clone(), fut).await
    }

    /// Synchronous variant of [`AuthProvider::scope`].
    pub fn sync_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT_AUTH.sync_scope(self.context.clone(), f)
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for AuthProvider {
    fn drop(&mut self) {
        self.context.unmount();
    }
}

/// The auth context of the enclosing [`AuthProvider`] scope.
///
/// # Errors
///
/// Returns [`AuthError::MissingProvider`] when called outside any scope.
pub fn use_auth() -> Result<AuthContext, AuthError> {
    CURRENT_AUTH.try_with(AuthContext::clone).map_err(|_| AuthError::MissingProvider)
}
