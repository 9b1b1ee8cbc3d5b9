//! Google OAuth access-token revocation.

#[cfg(test)]
#[path = "revoke_test.rs"]
mod tests;

use tracing::debug;

use super::TokenRevoker;
use crate::config::GOOGLE_REVOKE_ENDPOINT;
use crate::runtime::spawn_detached;

/// Sends a revocation request on a detached task and ignores the outcome.
#[derive(Debug, Clone)]
pub struct GoogleTokenRevoker {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTokenRevoker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(GOOGLE_REVOKE_ENDPOINT)
    }

    #[must_use]
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.to_owned() }
    }

    fn revoke_url(&self, token: &str) -> Option<url::Url> {
        url::Url::parse_with_params(&self.endpoint, &[("token", token)]).ok()
    }
}

impl Default for GoogleTokenRevoker {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRevoker for GoogleTokenRevoker {
    fn revoke(&self, token: &str) {
        let Some(url) = self.revoke_url(token) else {
            debug!(endpoint = %self.endpoint, "token revoke skipped: bad endpoint");
            return;
        };
        let client = self.client.clone();
        let spawned = spawn_detached(async move {
            if let Err(e) = client.post(url).send().await {
                debug!(error = %e, "token revoke request failed");
            }
        });
        if !spawned {
            debug!("token revoke skipped: no executor");
        }
    }
}
