//! Injected platform capabilities.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth core never touches browser globals. Navigation, the two
//! key-value stores, transient alerts, and token revocation are passed in as
//! trait objects so the same code runs in a browser (`hydrate` feature),
//! a CLI, or tests.

pub mod file;
pub mod memory;
pub mod revoke;

#[cfg(feature = "hydrate")]
pub mod browser;

use std::sync::Arc;
use std::time::Duration;

use crate::error::StorageError;

pub use file::JsonFileStore;
pub use memory::{LogNotifier, MemoryNavigator, MemoryStore};
pub use revoke::GoogleTokenRevoker;

/// A string key-value store with key enumeration (localStorage-like).
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns [`StorageError`] if the store cannot be enumerated.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// # Errors
    /// Returns [`StorageError`] if the store cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns [`StorageError`] if the value cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the removal fails.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Current location and hard navigation.
pub trait Navigator: Send + Sync {
    /// Path component of the current location (e.g. `/dashboard`).
    fn pathname(&self) -> String;
    /// Scheme, host and port of the current location, without trailing slash.
    fn origin(&self) -> String;
    /// Full current location.
    fn href(&self) -> String;
    /// Leave the current page for `href` (full reload, not client routing).
    fn redirect(&self, href: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Transient user-visible notification, dismissed after `duration`.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity, duration: Duration);
}

/// Fire-and-forget revocation of a third-party OAuth access token.
/// Implementations must not block and must not report failures.
pub trait TokenRevoker: Send + Sync {
    fn revoke(&self, token: &str);
}

/// The full capability set handed to the session bridge.
#[derive(Clone)]
pub struct Platform {
    pub navigator: Arc<dyn Navigator>,
    pub local_store: Arc<dyn KeyValueStore>,
    pub session_store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
    pub revoker: Arc<dyn TokenRevoker>,
}

impl Platform {
    /// In-process capabilities: memory stores, a recording navigator at
    /// `origin` + `path`, tracing notifications, and real Google revocation.
    #[must_use]
    pub fn in_memory(origin: &str, path: &str) -> Self {
        Self {
            navigator: Arc::new(MemoryNavigator::new(origin, path)),
            local_store: Arc::new(MemoryStore::new()),
            session_store: Arc::new(MemoryStore::new()),
            notifier: Arc::new(LogNotifier),
            revoker: Arc::new(GoogleTokenRevoker::new()),
        }
    }
}
