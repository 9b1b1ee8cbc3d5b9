use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::*;
use crate::error::BackendError;
use crate::platform::MemoryStore;
use crate::test_helpers::{FailingStore, MockAuth, ORIGIN, TestPlatform, session_for, settle};

fn rejected(message: &str) -> BackendError {
    BackendError::Status { status: 400, message: message.into() }
}

async fn mounted(auth: &Arc<MockAuth>, path: &str) -> (Arc<SessionBridge>, TestPlatform) {
    let env = TestPlatform::at(path);
    let bridge = SessionBridge::mount(auth.clone(), env.platform()).await;
    (bridge, env)
}

// =============================================================================
// MOUNT
// =============================================================================

#[tokio::test]
async fn mount_without_session_finishes_loading_with_no_user() {
    let auth = MockAuth::new();
    let (bridge, _env) = mounted(&auth, "/").await;

    assert!(!bridge.loading());
    assert_eq!(bridge.user(), None);
    assert!(bridge.is_mounted());
    assert_eq!(auth.hub.subscriber_count(), 1);
}

#[tokio::test]
async fn mount_with_session_sets_user_from_session() {
    let auth = MockAuth::with_session(session_for("u-9", "nine@inflow.dev", Some("nine")));
    let (bridge, _env) = mounted(&auth, "/").await;

    let user = bridge.user().expect("user");
    assert_eq!(user.id, "u-9");
    assert_eq!(user.email, "nine@inflow.dev");
    assert_eq!(user.username.as_deref(), Some("nine"));
    assert!(!bridge.loading());
}

#[tokio::test]
async fn failed_session_lookup_counts_as_signed_out() {
    let auth = MockAuth::new();
    auth.fail_get_session.store(true, Ordering::SeqCst);
    let (bridge, _env) = mounted(&auth, "/").await;

    assert_eq!(bridge.user(), None);
    assert!(!bridge.loading());
}

#[tokio::test]
async fn mount_subscribes_before_reading_session() {
    let auth = MockAuth::new();
    let (_bridge, _env) = mounted(&auth, "/").await;
    // The subscription exists by the time get_session is the first recorded call.
    assert_eq!(auth.calls(), vec!["get_session"]);
    assert_eq!(auth.hub.subscriber_count(), 1);
}

// =============================================================================
// EVENTS
// =============================================================================

#[tokio::test]
async fn signed_in_off_root_redirects_to_root() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/login").await;

    auth.publish(AuthEventKind::SignedIn, Some(session_for("u-1", "a@inflow.dev", None)));
    settle().await;

    assert_eq!(bridge.user().map(|u| u.id), Some("u-1".into()));
    assert_eq!(env.navigator.redirects(), vec!["/".to_owned()]);
}

#[tokio::test]
async fn signed_in_on_root_does_not_redirect() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/").await;

    auth.publish(AuthEventKind::SignedIn, Some(session_for("u-1", "a@inflow.dev", None)));
    settle().await;

    assert!(bridge.user().is_some());
    assert!(env.navigator.redirects().is_empty());
}

#[tokio::test]
async fn token_refresh_updates_user_without_redirect() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/boards/7").await;

    auth.publish(AuthEventKind::TokenRefreshed, Some(session_for("u-2", "b@inflow.dev", Some("bee"))));
    settle().await;

    assert_eq!(bridge.user().and_then(|u| u.username), Some("bee".into()));
    assert!(env.navigator.redirects().is_empty());
}

#[tokio::test]
async fn signed_in_then_signed_out_clears_user() {
    let auth = MockAuth::new();
    let (bridge, _env) = mounted(&auth, "/").await;

    auth.publish(AuthEventKind::SignedIn, Some(session_for("u-1", "a@inflow.dev", None)));
    auth.publish(AuthEventKind::SignedOut, None);
    settle().await;

    assert_eq!(bridge.user(), None);
    assert!(!bridge.loading());
}

#[tokio::test]
async fn repeated_identical_event_does_not_notify_watchers() {
    let auth = MockAuth::new();
    let (bridge, _env) = mounted(&auth, "/").await;
    let mut rx = bridge.watch();

    auth.publish(AuthEventKind::SignedIn, Some(session_for("u-1", "a@inflow.dev", None)));
    settle().await;
    assert!(rx.has_changed().unwrap());
    let _ = rx.borrow_and_update();

    auth.publish(AuthEventKind::TokenRefreshed, Some(session_for("u-1", "a@inflow.dev", None)));
    settle().await;
    assert!(!rx.has_changed().unwrap());
}

// =============================================================================
// SIGN UP / SIGN IN
// =============================================================================

#[tokio::test]
async fn sign_up_passes_through_response() {
    let auth = MockAuth::new();
    let (bridge, _env) = mounted(&auth, "/").await;

    let resp = bridge.sign_up("new@inflow.dev", "pw", "newbie").await.unwrap();
    assert_eq!(resp.user.and_then(|u| u.email), Some("new@inflow.dev".into()));
    assert!(resp.session.is_none());
}

#[tokio::test]
async fn sign_up_error_carries_backend_message() {
    let auth = MockAuth::new();
    *auth.sign_up_error.lock().unwrap() = Some(rejected("User already registered"));
    let (bridge, _env) = mounted(&auth, "/").await;

    let err = bridge.sign_up("dup@inflow.dev", "pw", "dup").await.unwrap_err();
    assert_eq!(err.to_string(), "User already registered");
}

#[tokio::test]
async fn sign_up_error_without_message_uses_fallback() {
    let auth = MockAuth::new();
    *auth.sign_up_error.lock().unwrap() = Some(rejected("  "));
    let (bridge, _env) = mounted(&auth, "/").await;

    let err = bridge.sign_up("x@inflow.dev", "pw", "x").await.unwrap_err();
    assert_eq!(err.message(), "Signup failed");
}

#[tokio::test]
async fn sign_in_error_uses_backend_message_or_fallback() {
    let auth = MockAuth::new();
    *auth.sign_in_error.lock().unwrap() = Some(rejected("Invalid login credentials"));
    let (bridge, _env) = mounted(&auth, "/").await;
    let err = bridge.sign_in("a@inflow.dev", "bad").await.unwrap_err();
    assert_eq!(err.message(), "Invalid login credentials");

    *auth.sign_in_error.lock().unwrap() = Some(rejected(""));
    let err = bridge.sign_in("a@inflow.dev", "bad").await.unwrap_err();
    assert_eq!(err.message(), "Login failed");
    assert_eq!(bridge.user(), None);
}

#[tokio::test]
async fn sign_in_success_updates_state_through_event() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/login").await;

    let resp = bridge.sign_in("a@inflow.dev", "pw").await.unwrap();
    assert!(resp.session.is_some());
    settle().await;

    assert_eq!(bridge.user().map(|u| u.email), Some("a@inflow.dev".into()));
    assert_eq!(env.navigator.last_redirect().as_deref(), Some("/"));
}

// =============================================================================
// SIGN OUT
// =============================================================================

#[tokio::test]
async fn sign_out_failure_alerts_and_leaves_storage_alone() {
    let auth = MockAuth::with_session(session_for("u-1", "a@inflow.dev", None));
    *auth.sign_out_error.lock().unwrap() = Some(rejected("network down"));
    let (bridge, env) = mounted(&auth, "/boards").await;
    env.local.set_item("sb-abcd-auth-token", "{}").unwrap();
    env.local.set_item(GOOGLE_TOKEN_KEY, "ya29.token").unwrap();

    let err = bridge.sign_out().await.unwrap_err();
    assert_eq!(err.message(), "network down");

    let notes = env.notifier.notes.lock().unwrap().clone();
    assert_eq!(notes, vec![(SIGN_OUT_FAILED_MESSAGE.to_owned(), Severity::Error, SIGN_OUT_ALERT)]);
    assert_eq!(env.local.len(), 2);
    assert!(env.navigator.redirects().is_empty());
    assert!(env.revoker.tokens.lock().unwrap().is_empty());
    assert!(bridge.user().is_some());
}

#[tokio::test]
async fn sign_out_purges_backend_keys_from_both_stores() {
    let auth = MockAuth::with_session(session_for("u-1", "a@inflow.dev", None));
    let (bridge, env) = mounted(&auth, "/boards").await;
    env.local.set_item("sb-abcd-auth-token", "{}").unwrap();
    env.local.set_item("supabase.auth.token", "{}").unwrap();
    env.local.set_item("theme", "dark").unwrap();
    env.session.set_item("sb-abcd-code-verifier", "v").unwrap();
    env.session.set_item("draft", "hello").unwrap();

    bridge.sign_out().await.unwrap();
    settle().await;

    assert_eq!(env.local.keys().unwrap(), vec!["theme".to_owned()]);
    assert_eq!(env.session.keys().unwrap(), vec!["draft".to_owned()]);
    assert_eq!(env.navigator.last_redirect().as_deref(), Some("/"));
    assert_eq!(bridge.user(), None);
    assert!(env.notifier.notes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sign_out_revokes_local_google_token_first() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/").await;
    env.local.set_item(GOOGLE_TOKEN_KEY, "local-token").unwrap();
    env.session.set_item(GOOGLE_TOKEN_KEY, "session-token").unwrap();

    bridge.sign_out().await.unwrap();
    assert_eq!(*env.revoker.tokens.lock().unwrap(), vec!["local-token".to_owned()]);
}

#[tokio::test]
async fn sign_out_falls_back_to_session_google_token() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/").await;
    env.local.set_item(GOOGLE_TOKEN_KEY, "").unwrap();
    env.session.set_item(GOOGLE_TOKEN_KEY, "session-token").unwrap();

    bridge.sign_out().await.unwrap();
    assert_eq!(*env.revoker.tokens.lock().unwrap(), vec!["session-token".to_owned()]);
}

#[tokio::test]
async fn sign_out_without_google_token_revokes_nothing() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/").await;

    bridge.sign_out().await.unwrap();
    assert!(env.revoker.tokens.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sign_out_swallows_storage_failures() {
    let auth = MockAuth::new();
    let env = TestPlatform::at("/boards");
    let mut platform = env.platform();
    platform.local_store = Arc::new(FailingStore);
    let bridge = SessionBridge::mount(auth.clone(), platform).await;
    env.session.set_item("sb-abcd-auth-token", "{}").unwrap();

    bridge.sign_out().await.unwrap();

    assert!(env.session.is_empty());
    assert_eq!(env.navigator.last_redirect().as_deref(), Some("/"));
}

#[test]
fn purge_reports_removed_count() {
    let store = MemoryStore::with_items([("sb-x-auth-token", "1"), ("my-supabase-cache", "2"), ("keep", "3")]);
    assert_eq!(purge_backend_keys(&store).unwrap(), 2);
    assert_eq!(store.keys().unwrap(), vec!["keep".to_owned()]);
}

#[test]
fn purge_propagates_store_errors() {
    assert!(purge_backend_keys(&FailingStore).is_err());
}

// =============================================================================
// GOOGLE
// =============================================================================

#[tokio::test]
async fn google_sign_in_requests_account_chooser_and_navigates() {
    let auth = MockAuth::new();
    let (bridge, env) = mounted(&auth, "/login").await;

    let resp = bridge.sign_in_with_google().await.unwrap();

    let (provider, options) = auth.last_oauth.lock().unwrap().clone().expect("oauth call");
    assert_eq!(provider, GOOGLE_PROVIDER);
    assert_eq!(options.redirect_to, Some(format!("{ORIGIN}/")));
    assert_eq!(options.query_params, vec![("prompt".to_owned(), "select_account".to_owned())]);
    assert_eq!(env.navigator.last_redirect(), Some(resp.url));
}

#[tokio::test]
async fn google_sign_in_error_does_not_navigate() {
    let auth = MockAuth::new();
    *auth.oauth_error.lock().unwrap() = Some(rejected("Unsupported provider: provider is not enabled"));
    let (bridge, env) = mounted(&auth, "/login").await;

    let err = bridge.sign_in_with_google().await.unwrap_err();
    assert_eq!(err.message(), "Unsupported provider: provider is not enabled");
    assert!(env.navigator.redirects().is_empty());
}

// =============================================================================
// UNMOUNT
// =============================================================================

#[tokio::test]
async fn unmount_stops_updates_and_is_idempotent() {
    let auth = MockAuth::new();
    let (bridge, _env) = mounted(&auth, "/").await;

    bridge.unmount();
    bridge.unmount();
    settle().await;
    assert!(!bridge.is_mounted());

    auth.publish(AuthEventKind::SignedIn, Some(session_for("u-1", "a@inflow.dev", None)));
    settle().await;
    assert_eq!(bridge.user(), None);
    assert_eq!(auth.hub.subscriber_count(), 0);
}
