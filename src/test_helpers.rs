//! In-memory doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::broadcast;

use crate::backend::{AuthBackend, DataBackend, OAuthOptions, UpsertOptions};
use crate::error::{BackendError, StorageError};
use crate::events::AuthEventHub;
use crate::platform::{KeyValueStore, MemoryNavigator, MemoryStore, Notifier, Platform, Severity, TokenRevoker};
use crate::types::{AuthEvent, AuthEventKind, AuthResponse, OAuthResponse, Session, SessionUser};

pub const ORIGIN: &str = "http://localhost:5173";

/// Build a session whose user has the given id, email and optional username.
pub fn session_for(id: &str, email: &str, username: Option<&str>) -> Session {
    let mut metadata = Map::new();
    if let Some(name) = username {
        metadata.insert("username".into(), json!(name));
    }
    Session {
        access_token: format!("at-{id}"),
        refresh_token: format!("rt-{id}"),
        token_type: "bearer".into(),
        expires_in: 3600,
        expires_at: None,
        user: Some(SessionUser {
            id: id.into(),
            email: Some(email.into()),
            user_metadata: metadata,
            app_metadata: Map::new(),
            extra: Map::new(),
        }),
    }
}

/// Let spawned subscriber tasks drain their queues (current-thread runtime).
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// MockAuth
// =============================================================================

#[derive(Default)]
pub struct MockAuth {
    pub hub: AuthEventHub,
    pub session: Mutex<Option<Session>>,
    pub fail_get_session: AtomicBool,
    pub sign_up_error: Mutex<Option<BackendError>>,
    pub sign_in_error: Mutex<Option<BackendError>>,
    pub sign_out_error: Mutex<Option<BackendError>>,
    pub oauth_error: Mutex<Option<BackendError>>,
    pub supports_url: AtomicBool,
    pub url_result: Mutex<Option<Result<Option<Session>, BackendError>>>,
    pub calls: Mutex<Vec<String>>,
    pub last_oauth: Mutex<Option<(String, OAuthOptions)>>,
    pub url_calls: Mutex<Vec<(String, bool)>>,
}

impl MockAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_session(session: Session) -> Arc<Self> {
        let mock = Self::default();
        *mock.session.lock().unwrap() = Some(session);
        Arc::new(mock)
    }

    pub fn publish(&self, kind: AuthEventKind, session: Option<Session>) {
        self.hub.publish(AuthEvent::new(kind, session));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_owned());
    }
}

#[async_trait]
impl AuthBackend for MockAuth {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        self.record("get_session");
        if self.fail_get_session.load(Ordering::SeqCst) {
            return Err(BackendError::Request("offline".into()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.hub.receiver()
    }

    async fn sign_up(&self, email: &str, _password: &str, username: &str) -> Result<AuthResponse, BackendError> {
        self.record("sign_up");
        if let Some(err) = self.sign_up_error.lock().unwrap().clone() {
            return Err(err);
        }
        let user = session_for("u-new", email, Some(username)).user;
        Ok(AuthResponse { user, session: None })
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<AuthResponse, BackendError> {
        self.record("sign_in_with_password");
        if let Some(err) = self.sign_in_error.lock().unwrap().clone() {
            return Err(err);
        }
        let session = session_for("u-1", email, None);
        *self.session.lock().unwrap() = Some(session.clone());
        self.publish(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(AuthResponse { user: session.user.clone(), session: Some(session) })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record("sign_out");
        if let Some(err) = self.sign_out_error.lock().unwrap().clone() {
            return Err(err);
        }
        *self.session.lock().unwrap() = None;
        self.publish(AuthEventKind::SignedOut, None);
        Ok(())
    }

    async fn sign_in_with_oauth(&self, provider: &str, options: OAuthOptions) -> Result<OAuthResponse, BackendError> {
        self.record("sign_in_with_oauth");
        *self.last_oauth.lock().unwrap() = Some((provider.to_owned(), options));
        if let Some(err) = self.oauth_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(OAuthResponse {
            provider: provider.to_owned(),
            url: format!("https://abcd.supabase.co/auth/v1/authorize?provider={provider}"),
        })
    }

    fn supports_session_from_url(&self) -> bool {
        self.supports_url.load(Ordering::SeqCst)
    }

    async fn get_session_from_url(&self, url: &str, store_session: bool) -> Result<Option<Session>, BackendError> {
        self.url_calls.lock().unwrap().push((url.to_owned(), store_session));
        let result = self.url_result.lock().unwrap().clone().unwrap_or(Ok(None));
        if let Ok(Some(session)) = &result {
            if store_session {
                *self.session.lock().unwrap() = Some(session.clone());
                self.publish(AuthEventKind::SignedIn, Some(session.clone()));
            }
        }
        result
    }
}

// =============================================================================
// MockData
// =============================================================================

#[derive(Default)]
pub struct MockData {
    pub rows: Mutex<Vec<(String, Value, UpsertOptions)>>,
    pub fail: AtomicBool,
}

impl MockData {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rows(&self) -> Vec<(String, Value, UpsertOptions)> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataBackend for MockData {
    async fn upsert(&self, table: &str, row: Value, options: UpsertOptions) -> Result<Option<Value>, BackendError> {
        self.rows.lock().unwrap().push((table.to_owned(), row, options));
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Status { status: 403, message: "permission denied for table users".into() });
        }
        Ok(None)
    }
}

// =============================================================================
// Platform doubles
// =============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub notes: Mutex<Vec<(String, Severity, Duration)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity, duration: Duration) {
        self.notes.lock().unwrap().push((message.to_owned(), severity, duration));
    }
}

#[derive(Default)]
pub struct RecordingRevoker {
    pub tokens: Mutex<Vec<String>>,
}

impl TokenRevoker for RecordingRevoker {
    fn revoke(&self, token: &str) {
        self.tokens.lock().unwrap().push(token.to_owned());
    }
}

/// A store whose every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Err(StorageError::Unavailable("denied".into()))
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Operation { key: key.into(), message: "denied".into() })
    }

    fn set_item(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Operation { key: key.into(), message: "denied".into() })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        Err(StorageError::Operation { key: key.into(), message: "denied".into() })
    }
}

/// Concrete handles behind a [`Platform`], kept for assertions.
pub struct TestPlatform {
    pub navigator: Arc<MemoryNavigator>,
    pub local: Arc<MemoryStore>,
    pub session: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub revoker: Arc<RecordingRevoker>,
}

impl TestPlatform {
    pub fn at(path: &str) -> Self {
        Self {
            navigator: Arc::new(MemoryNavigator::new(ORIGIN, path)),
            local: Arc::new(MemoryStore::new()),
            session: Arc::new(MemoryStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            revoker: Arc::new(RecordingRevoker::default()),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            navigator: self.navigator.clone(),
            local_store: self.local.clone(),
            session_store: self.session.clone(),
            notifier: self.notifier.clone(),
            revoker: self.revoker.clone(),
        }
    }
}
