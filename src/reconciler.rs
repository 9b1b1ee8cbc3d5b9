//! Profile reconciliation on auth changes.
//!
//! SYSTEM CONTEXT
//! ==============
//! A second, independent subscriber to backend auth events. For every event
//! that carries a user it upserts that user's profile row and then announces
//! the change on the local bus. It shares nothing with the session bridge;
//! the two subscribers may observe the same event in either order.
//!
//! On start it also finishes a pending OAuth redirect when the backend can
//! read sessions out of the current URL. When no redirect session was
//! published, a user-bearing session restored from storage is reconciled
//! once as `INITIAL_SESSION`.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here fails the caller. Redirect and snapshot failures are logged
//! at debug, upsert failures at error, and the bus event is dispatched
//! regardless of the upsert outcome.

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::backend::{AuthBackend, DataBackend, Returning, UpsertOptions};
use crate::bus::{AppEvent, LocalBus};
use crate::config::USERS_TABLE;
use crate::events::Subscription;
use crate::types::{AuthEvent, AuthEventKind, Session, SessionUser};

/// Row written to the users table for each observed user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub updated_at: String,
}

impl ProfileRow {
    #[must_use]
    pub fn for_user(user: &SessionUser, now: OffsetDateTime) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            updated_at: now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string()),
        }
    }
}

pub struct Reconciler {
    subscription: Subscription,
    session: Option<Session>,
}

impl Reconciler {
    /// Subscribe to auth events, finish any OAuth redirect in `current_url`,
    /// then snapshot the current session.
    pub async fn start(
        backend: Arc<dyn AuthBackend>,
        data: Arc<dyn DataBackend>,
        bus: LocalBus,
        current_url: &str,
    ) -> Self {
        let subscription = {
            let data = data.clone();
            let bus = bus.clone();
            Subscription::spawn(backend.subscribe(), move |event: AuthEvent| {
                let data = data.clone();
                let bus = bus.clone();
                async move { reconcile(event, data.as_ref(), &bus).await }
            })
        };

        let redirected = complete_redirect(backend.as_ref(), current_url).await.is_some();

        let session = match backend.get_session().await {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "session snapshot failed");
                None
            }
        };
        // A completed redirect already published SIGNED_IN to the subscription.
        if !redirected && session.as_ref().is_some_and(|s| s.user.is_some()) {
            let event = AuthEvent::new(AuthEventKind::InitialSession, session.clone());
            reconcile(event, data.as_ref(), &bus).await;
        }
        info!(subscription = %subscription.id(), signed_in = session.is_some(), "profile reconciler started");
        Self { subscription, session }
    }

    /// Session observed when the reconciler started.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn subscription_id(&self) -> Uuid {
        self.subscription.id()
    }

    pub fn stop(self) {
        self.subscription.unsubscribe();
    }
}

/// Read and store a session from an OAuth redirect URL, if the backend can.
/// Returns the session found, if any; failures are logged and yield `None`.
pub async fn complete_redirect(backend: &dyn AuthBackend, url: &str) -> Option<Session> {
    if !backend.supports_session_from_url() {
        debug!("backend cannot read sessions from URLs; skipping redirect completion");
        return None;
    }
    match backend.get_session_from_url(url, true).await {
        Ok(session) => {
            if session.is_some() {
                info!("oauth redirect completed");
            }
            session
        }
        Err(e) => {
            debug!(error = %e, "oauth redirect completion failed");
            None
        }
    }
}

async fn reconcile(event: AuthEvent, data: &dyn DataBackend, bus: &LocalBus) {
    let Some(session) = event.session else {
        return;
    };
    let Some(user) = session.user.as_ref() else {
        return;
    };

    let row = ProfileRow::for_user(user, OffsetDateTime::now_utc());
    match serde_json::to_value(&row) {
        Ok(value) => {
            let options = UpsertOptions { on_conflict: None, returning: Returning::Minimal };
            if let Err(e) = data.upsert(USERS_TABLE, value, options).await {
                error!(user_id = %row.id, error = %e, "profile upsert failed");
            }
        }
        Err(e) => error!(user_id = %row.id, error = %e, "profile row encode failed"),
    }

    debug!(event = %event.kind, user_id = %row.id, "auth change dispatched");
    bus.dispatch(AppEvent::AuthChanged { session });
}
