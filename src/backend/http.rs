//! Supabase-compatible REST implementation of the backend contracts.
//!
//! ARCHITECTURE
//! ============
//! Auth calls go to `{url}/auth/v1/*`, table writes to `{url}/rest/v1/*`.
//! Every request carries the project's anon key as `apikey`; the bearer is
//! the current access token when signed in, else the anon key.
//!
//! The current session is cached in memory and persisted as JSON in the
//! injected local store under `sb-<project-ref>-auth-token`, the same key
//! the browser SDK uses, so the sign-out storage purge removes it.
//!
//! ERROR HANDLING
//! ==============
//! Non-success responses become `BackendError::Status` with the message
//! pulled from the backend's error body. Persisting the session is
//! best-effort; a failing store only costs persistence across restarts.

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use super::{AuthBackend, DataBackend, OAuthOptions, Returning, UpsertOptions};
use crate::config::AuthConfig;
use crate::error::BackendError;
use crate::events::AuthEventHub;
use crate::platform::KeyValueStore;
use crate::types::{AuthEvent, AuthEventKind, AuthResponse, OAuthResponse, Session, SessionUser};

/// Seconds assumed when a redirect fragment omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    storage_key: String,
    store: Arc<dyn KeyValueStore>,
    hub: AuthEventHub,
    session: RwLock<Option<Session>>,
}

impl HttpBackend {
    /// Build a backend client and restore any session persisted in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &AuthConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        let storage_key = config.storage_key();
        let session = load_persisted(store.as_ref(), &storage_key);
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            anon_key: config.anon_key.clone(),
            storage_key,
            store,
            hub: AuthEventHub::default(),
            session: RwLock::new(session),
        })
    }

    /// The publish point this backend pushes auth events through.
    #[must_use]
    pub fn hub(&self) -> &AuthEventHub {
        &self.hub
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn request(&self, method: Method, url: &str, bearer: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn access_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.access_token.clone())
    }

    async fn set_session(&self, session: Option<Session>) {
        match &session {
            Some(s) => match serde_json::to_string(s) {
                Ok(raw) => {
                    if let Err(e) = self.store.set_item(&self.storage_key, &raw) {
                        warn!(error = %e, "session persist failed");
                    }
                }
                Err(e) => warn!(error = %e, "session encode failed"),
            },
            None => {
                if let Err(e) = self.store.remove_item(&self.storage_key) {
                    debug!(error = %e, "session removal failed");
                }
            }
        }
        *self.session.write().await = session;
    }

    async fn sign_in_with(&self, session: Session) -> AuthResponse {
        self.set_session(Some(session.clone())).await;
        self.hub.publish(AuthEvent::new(AuthEventKind::SignedIn, Some(session.clone())));
        AuthResponse { user: session.user.clone(), session: Some(session) }
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[cfg_attr(all(target_arch = "wasm32", feature = "hydrate"), async_trait(?Send))]
#[cfg_attr(not(all(target_arch = "wasm32", feature = "hydrate")), async_trait)]
impl AuthBackend for HttpBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.session.read().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.hub.receiver()
    }

    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<AuthResponse, BackendError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "username": username },
        });
        let req = self.request(Method::POST, &self.auth_url("signup"), None).json(&body);
        let value: Value = send_json(req).await?;

        // Auto-confirmed projects answer with a session; otherwise with the
        // bare user awaiting email confirmation.
        if value.get("access_token").is_some() {
            let session: Session = decode(value)?;
            return Ok(self.sign_in_with(session).await);
        }
        let user: SessionUser = decode(value)?;
        Ok(AuthResponse { user: Some(user), session: None })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let req = self
            .request(Method::POST, &self.auth_url("token?grant_type=password"), None)
            .json(&body);
        let session: Session = send_json(req).await?;
        Ok(self.sign_in_with(session).await)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(token) = self.access_token().await {
            let resp = self
                .request(Method::POST, &self.auth_url("logout"), Some(&token))
                .send()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?;
            let status = resp.status().as_u16();
            // Already revoked or unknown on the server: the local session is stale anyway.
            if status != 401 && status != 404 {
                check_status(resp).await?;
            }
        }
        self.set_session(None).await;
        self.hub.publish(AuthEvent::new(AuthEventKind::SignedOut, None));
        Ok(())
    }

    async fn sign_in_with_oauth(&self, provider: &str, options: OAuthOptions) -> Result<OAuthResponse, BackendError> {
        let url = authorize_url(&self.auth_url("authorize"), provider, &options)?;
        Ok(OAuthResponse { provider: provider.to_owned(), url })
    }

    fn supports_session_from_url(&self) -> bool {
        true
    }

    async fn get_session_from_url(&self, url: &str, store_session: bool) -> Result<Option<Session>, BackendError> {
        let params = redirect_params(url)?;
        if let Some(message) = params.get("error_description").or_else(|| params.get("error")) {
            return Err(BackendError::Redirect(message.clone()));
        }
        let Some(access_token) = params.get("access_token") else {
            return Ok(None);
        };

        let req = self.request(Method::GET, &self.auth_url("user"), Some(access_token));
        let user: SessionUser = send_json(req).await?;

        let expires_in = params
            .get("expires_in")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        // An absurd lifetime from the URL clamps to the far future instead of overflowing.
        let expires_at = time::OffsetDateTime::now_utc()
            .unix_timestamp()
            .saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX));
        let session = Session {
            access_token: access_token.clone(),
            refresh_token: params.get("refresh_token").cloned().unwrap_or_default(),
            token_type: params.get("token_type").cloned().unwrap_or_else(|| "bearer".to_owned()),
            expires_in,
            expires_at: Some(expires_at),
            user: Some(user),
        };

        if store_session {
            self.sign_in_with(session.clone()).await;
        }
        Ok(Some(session))
    }
}

// =============================================================================
// DATA
// =============================================================================

#[cfg_attr(all(target_arch = "wasm32", feature = "hydrate"), async_trait(?Send))]
#[cfg_attr(not(all(target_arch = "wasm32", feature = "hydrate")), async_trait)]
impl DataBackend for HttpBackend {
    async fn upsert(&self, table: &str, row: Value, options: UpsertOptions) -> Result<Option<Value>, BackendError> {
        let mut url = url::Url::parse(&format!("{}/rest/v1/{table}", self.base_url))
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        if let Some(target) = &options.on_conflict {
            url.query_pairs_mut().append_pair("on_conflict", target);
        }
        let token = self.access_token().await;
        let req = self
            .request(Method::POST, url.as_str(), token.as_deref())
            .header("Prefer", format!("resolution=merge-duplicates,return={}", options.returning.as_str()))
            .json(&row);
        let resp = req.send().await.map_err(|e| BackendError::Request(e.to_string()))?;
        let resp = check_status(resp).await?;
        match options.returning {
            Returning::Minimal => Ok(None),
            Returning::Representation => resp.json().await.map(Some).map_err(|e| BackendError::Parse(e.to_string())),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn load_persisted(store: &dyn KeyValueStore, key: &str) -> Option<Session> {
    let raw = match store.get_item(key) {
        Ok(raw) => raw?,
        Err(e) => {
            debug!(error = %e, "persisted session unreadable");
            return None;
        }
    };
    serde_json::from_str(&raw)
        .map_err(|e| debug!(error = %e, "persisted session undecodable"))
        .ok()
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, BackendError> {
    let resp = req.send().await.map_err(|e| BackendError::Request(e.to_string()))?;
    let resp = check_status(resp).await?;
    resp.json::<T>().await.map_err(|e| BackendError::Parse(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Parse(e.to_string()))
}

async fn check_status(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status { status: status.as_u16(), message: error_message(&body) })
}

/// Pull a human-readable message out of a backend error body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["msg", "message", "error_description", "error"] {
            if let Some(Value::String(s)) = map.get(field) {
                if !s.trim().is_empty() {
                    return s.clone();
                }
            }
        }
    }
    body.trim().to_owned()
}

pub(crate) fn authorize_url(base: &str, provider: &str, options: &OAuthOptions) -> Result<String, BackendError> {
    let mut url = url::Url::parse(base).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("provider", provider);
        if let Some(redirect_to) = &options.redirect_to {
            query.append_pair("redirect_to", redirect_to);
        }
        if let Some(scopes) = &options.scopes {
            query.append_pair("scopes", scopes);
        }
        for (key, value) in &options.query_params {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Parameters of an OAuth redirect: fragment pairs, with query pairs as a
/// fallback (errors may arrive in either).
pub(crate) fn redirect_params(url: &str) -> Result<HashMap<String, String>, BackendError> {
    let parsed = url::Url::parse(url).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
    let mut params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
    if let Some(fragment) = parsed.fragment() {
        params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
    }
    Ok(params)
}
