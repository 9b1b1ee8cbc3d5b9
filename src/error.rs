//! Error types for auth operations, backend calls, and platform storage.
//!
//! ERROR HANDLING
//! ==============
//! Two tiers. Operation-level failures (sign-up, sign-in, the primary
//! sign-out call, OAuth initiation) surface to callers as [`AuthError`].
//! Best-effort steps (storage purge, token revocation, profile upsert,
//! URL session extraction) produce [`BackendError`] / [`StorageError`]
//! values that are logged where they occur and then dropped.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

// =============================================================================
// AUTH ERROR
// =============================================================================

/// Uniform error returned by the session bridge operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The backend rejected an operation. `message` is the backend's own
    /// message, or the operation's fallback when the backend sent none.
    #[error("{message}")]
    Backend { message: String },

    /// The auth context accessor was used outside an `AuthProvider` scope.
    #[error("use_auth must be used within an AuthProvider")]
    MissingProvider,
}

impl AuthError {
    /// Wrap a backend failure, substituting `fallback` for an empty message.
    #[must_use]
    pub fn from_backend(err: &BackendError, fallback: &str) -> Self {
        let message = err.to_string();
        let message = if message.trim().is_empty() { fallback.to_owned() } else { message };
        Self::Backend { message }
    }

    /// Human-readable message suitable for display.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

// =============================================================================
// BACKEND ERROR
// =============================================================================

/// Errors produced by [`crate::backend::AuthBackend`] and
/// [`crate::backend::DataBackend`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status. Displays only the
    /// backend's message so it can be shown to users verbatim.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// A URL could not be built or parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The OAuth redirect carried an error instead of tokens.
    #[error("{0}")]
    Redirect(String),

    /// The backend does not offer this capability.
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

// =============================================================================
// STORAGE ERROR
// =============================================================================

/// Errors produced by [`crate::platform::KeyValueStore`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The store cannot be reached at all (no window, access denied).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A single read, write, or removal failed.
    #[error("storage operation on `{key}` failed: {message}")]
    Operation { key: String, message: String },
}
