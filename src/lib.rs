//! Client-side authentication session management for Inflow.
//!
//! SYSTEM CONTEXT
//! ==============
//! Sits between UI code and a hosted auth/data backend. Two independent
//! subscribers consume the backend's auth event stream:
//!
//! - [`bridge::SessionBridge`] mirrors the session into observable
//!   [`state::AuthState`] and exposes sign-up, sign-in, sign-out and Google
//!   OAuth. [`provider::AuthProvider`] scopes it for [`provider::use_auth`].
//! - [`reconciler::Reconciler`] completes OAuth redirects, upserts the
//!   user's profile row, and announces changes on the [`bus::LocalBus`].
//!
//! ARCHITECTURE
//! ============
//! The backend is consumed through the [`backend::AuthBackend`] and
//! [`backend::DataBackend`] traits; [`backend::HttpBackend`] implements
//! both over REST. Browser capabilities (navigation, storage, alerts, token
//! revocation) are injected through [`platform::Platform`], with in-memory
//! and file-backed implementations for native hosts and a `hydrate`
//! feature for the browser. Background work (event subscriptions, token
//! revocation) goes through [`runtime::spawn_detached`], which uses tokio
//! natively and the page event loop in the browser.

pub mod backend;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod provider;
pub mod reconciler;
pub mod runtime;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use bridge::SessionBridge;
pub use config::AuthConfig;
pub use error::{AuthError, BackendError, StorageError};
pub use provider::{AuthContext, AuthProvider, use_auth};
pub use reconciler::Reconciler;
pub use state::{AuthPhase, AuthState};
pub use types::{AuthEvent, AuthEventKind, Session, User};
