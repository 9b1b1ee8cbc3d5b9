//! Backend connection configuration parsed from environment variables,
//! plus the fixed names this layer shares with the hosted backend.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::time::Duration;

/// Storage keys starting with this prefix belong to the backend SDK.
pub const RESERVED_KEY_PREFIX: &str = "sb-";
/// Storage keys containing the backend's ecosystem name are purged as well.
pub const ECOSYSTEM_MARKER: &str = "supabase";
/// Where a separately-obtained Google access token is kept.
pub const GOOGLE_TOKEN_KEY: &str = "google_oauth_access_token";
pub const GOOGLE_REVOKE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/revoke";
/// Backend table holding denormalized user rows.
pub const USERS_TABLE: &str = "users";
pub const APP_ROOT: &str = "/";
pub const SIGN_OUT_ALERT: Duration = Duration::from_millis(5000);

pub const DEFAULT_SITE_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_HTTP_TIMEOUT_SECS, connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Project base URL without trailing slash (e.g. `https://abcd.supabase.co`).
    pub backend_url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
    /// Origin the application is served from; OAuth redirects land on `<origin>/`.
    pub site_origin: String,
    pub timeouts: HttpTimeouts,
}

impl AuthConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `INFLOW_BACKEND_URL`
    /// - `INFLOW_BACKEND_ANON_KEY`
    ///
    /// Optional:
    /// - `INFLOW_SITE_ORIGIN`: default `http://localhost:5173`
    /// - `INFLOW_HTTP_TIMEOUT_SECS`: default 30
    /// - `INFLOW_HTTP_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or the
    /// backend URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = required("INFLOW_BACKEND_URL")?;
        let anon_key = required("INFLOW_BACKEND_ANON_KEY")?;
        let site_origin = std::env::var("INFLOW_SITE_ORIGIN").unwrap_or_else(|_| DEFAULT_SITE_ORIGIN.to_owned());
        let timeouts = HttpTimeouts {
            request_secs: env_parse("INFLOW_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            connect_secs: env_parse("INFLOW_HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        };
        Self::new(&backend_url, anon_key, &site_origin, timeouts)
    }

    /// Build config from explicit values, normalizing trailing slashes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `backend_url` is not an absolute URL.
    pub fn new(backend_url: &str, anon_key: String, site_origin: &str, timeouts: HttpTimeouts) -> Result<Self, ConfigError> {
        let backend_url = backend_url.trim_end_matches('/').to_owned();
        if url::Url::parse(&backend_url).is_err() {
            return Err(ConfigError::Invalid { var: "INFLOW_BACKEND_URL", value: backend_url });
        }
        let site_origin = site_origin.trim_end_matches('/').to_owned();
        Ok(Self { backend_url, anon_key, site_origin, timeouts })
    }

    /// Project reference: the first label of the backend host.
    #[must_use]
    pub fn project_ref(&self) -> String {
        url::Url::parse(&self.backend_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.split('.').next().unwrap_or(h).to_owned()))
            .unwrap_or_else(|| "local".to_owned())
    }

    /// Storage key under which the backend session is persisted.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{RESERVED_KEY_PREFIX}{}-auth-token", self.project_ref())
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing { var }),
    }
}

fn env_parse(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Whether a storage key belongs to the backend SDK and must be purged on sign-out.
#[must_use]
pub fn is_backend_key(key: &str) -> bool {
    key.starts_with(RESERVED_KEY_PREFIX) || key.contains(ECOSYSTEM_MARKER)
}
