//! In-process capability implementations for non-browser hosts and tests.

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use super::{KeyValueStore, Navigator, Notifier, Severity};
use crate::error::StorageError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// `BTreeMap`-backed store; keys enumerate in sorted order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `pairs`.
    pub fn with_items<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let items = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { items: Mutex::new(items) }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.items).keys().cloned().collect())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.items).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.items).remove(key);
        Ok(())
    }
}

// =============================================================================
// MEMORY NAVIGATOR
// =============================================================================

/// Navigator that records redirects instead of leaving the page.
///
/// Same-origin redirects move the current path; external ones (an OAuth
/// authorize URL) are only recorded.
#[derive(Debug)]
pub struct MemoryNavigator {
    origin: String,
    path: Mutex<String>,
    redirects: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(origin: &str, path: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_owned(),
            path: Mutex::new(path.to_owned()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Every redirect target, oldest first.
    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        lock(&self.redirects).clone()
    }

    #[must_use]
    pub fn last_redirect(&self) -> Option<String> {
        lock(&self.redirects).last().cloned()
    }
}

impl Navigator for MemoryNavigator {
    fn pathname(&self) -> String {
        lock(&self.path).clone()
    }

    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn href(&self) -> String {
        format!("{}{}", self.origin, self.pathname())
    }

    fn redirect(&self, href: &str) {
        lock(&self.redirects).push(href.to_owned());
        let local = href.strip_prefix(self.origin.as_str()).unwrap_or(href);
        if local.starts_with('/') {
            *lock(&self.path) = local.to_owned();
        }
    }
}

// =============================================================================
// LOG NOTIFIER
// =============================================================================

/// Emits notifications through tracing; for hosts with no visible surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity, duration: Duration) {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        match severity {
            Severity::Info => info!(duration_ms, "{message}"),
            Severity::Warning | Severity::Error => warn!(?severity, duration_ms, "{message}"),
        }
    }
}
