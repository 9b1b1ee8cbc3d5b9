//! Browser capability bindings over `web-sys` (hydrate builds only).
//!
//! Every call goes through `web_sys::window()` at use time; a missing
//! window or a denied storage surfaces as [`StorageError::Unavailable`]
//! rather than a panic.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use web_sys::Storage;

use super::{GoogleTokenRevoker, KeyValueStore, Navigator, Notifier, Platform, Severity};
use crate::error::StorageError;

fn js_err(e: &wasm_bindgen::JsValue) -> String {
    format!("{e:?}")
}

impl Platform {
    /// Capabilities backed by the current browser window.
    #[must_use]
    pub fn browser() -> Self {
        Self {
            navigator: Arc::new(WindowNavigator),
            local_store: Arc::new(WebStorage::local()),
            session_store: Arc::new(WebStorage::session()),
            notifier: Arc::new(DomNotifier),
            revoker: Arc::new(GoogleTokenRevoker::new()),
        }
    }
}

// =============================================================================
// WEB STORAGE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Session,
}

/// `window.localStorage` or `window.sessionStorage`.
#[derive(Debug, Clone, Copy)]
pub struct WebStorage {
    kind: StorageKind,
}

impl WebStorage {
    #[must_use]
    pub fn local() -> Self {
        Self { kind: StorageKind::Local }
    }

    #[must_use]
    pub fn session() -> Self {
        Self { kind: StorageKind::Session }
    }

    fn storage(&self) -> Result<Storage, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".to_owned()))?;
        let storage = match self.kind {
            StorageKind::Local => window.local_storage(),
            StorageKind::Session => window.session_storage(),
        };
        storage
            .map_err(|e| StorageError::Unavailable(js_err(&e)))?
            .ok_or_else(|| StorageError::Unavailable("storage disabled".to_owned()))
    }
}

impl KeyValueStore for WebStorage {
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let storage = self.storage()?;
        let len = storage.length().map_err(|e| StorageError::Unavailable(js_err(&e)))?;
        let mut keys = Vec::new();
        for i in 0..len {
            if let Ok(Some(key)) = storage.key(i) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Operation { key: key.to_owned(), message: js_err(&e) })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Operation { key: key.to_owned(), message: js_err(&e) })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Operation { key: key.to_owned(), message: js_err(&e) })
    }
}

// =============================================================================
// WINDOW NAVIGATOR
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowNavigator;

impl WindowNavigator {
    fn location() -> Option<web_sys::Location> {
        web_sys::window().map(|w| w.location())
    }
}

impl Navigator for WindowNavigator {
    fn pathname(&self) -> String {
        Self::location().and_then(|l| l.pathname().ok()).unwrap_or_else(|| "/".to_owned())
    }

    fn origin(&self) -> String {
        Self::location().and_then(|l| l.origin().ok()).unwrap_or_default()
    }

    fn href(&self) -> String {
        Self::location().and_then(|l| l.href().ok()).unwrap_or_default()
    }

    fn redirect(&self, href: &str) {
        if let Some(location) = Self::location() {
            if let Err(e) = location.set_href(href) {
                debug!(error = %js_err(&e), href, "redirect failed");
            }
        }
    }
}

// =============================================================================
// DOM NOTIFIER
// =============================================================================

/// Appends a `role="alert"` element to `<body>` and removes it after the
/// requested duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomNotifier;

fn alert_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "inflow-alert inflow-alert-info",
        Severity::Warning => "inflow-alert inflow-alert-warning",
        Severity::Error => "inflow-alert inflow-alert-error",
    }
}

impl Notifier for DomNotifier {
    fn notify(&self, message: &str, severity: Severity, duration: Duration) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(body) = document.body() else {
            return;
        };
        let Ok(element) = document.create_element("div") else {
            return;
        };
        element.set_text_content(Some(message));
        if let Err(e) = element.set_attribute("role", "alert") {
            debug!(error = %js_err(&e), "alert role not set");
        }
        element.set_class_name(alert_class(severity));
        if body.append_child(&element).is_err() {
            return;
        }
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        gloo_timers::callback::Timeout::new(millis, move || element.remove()).forget();
    }
}
