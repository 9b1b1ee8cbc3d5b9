use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};

use super::*;

type Hits = Arc<Mutex<Vec<(String, Option<String>)>>>;

async fn record(State(hits): State<Hits>, req: Request) -> &'static str {
    hits.lock().unwrap().push((req.method().to_string(), req.uri().query().map(str::to_owned)));
    "ok"
}

async fn spawn_revoke_endpoint() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new().fallback(record).with_state(hits.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/revoke"), hits)
}

#[test]
fn revoke_url_puts_token_in_query() {
    let revoker = GoogleTokenRevoker::new();
    let url = revoker.revoke_url("ya29.token").unwrap();
    assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/revoke?"));
    assert_eq!(url.query(), Some("token=ya29.token"));
}

#[test]
fn revoke_url_encodes_token() {
    let revoker = GoogleTokenRevoker::new();
    let url = revoker.revoke_url("a b&c").unwrap();
    assert_eq!(url.query(), Some("token=a+b%26c"));
}

#[test]
fn revoke_without_runtime_is_noop() {
    GoogleTokenRevoker::new().revoke("token");
}

#[test]
fn bad_endpoint_is_noop() {
    let revoker = GoogleTokenRevoker::with_endpoint("not a url");
    assert!(revoker.revoke_url("t").is_none());
    revoker.revoke("t");
}

#[tokio::test]
async fn revoke_against_unreachable_host_does_not_surface_errors() {
    let revoker = GoogleTokenRevoker::with_endpoint("http://127.0.0.1:9/revoke");
    revoker.revoke("token");
    tokio::task::yield_now().await;
}

#[tokio::test]
async fn revoke_posts_token_in_background() {
    let (endpoint, hits) = spawn_revoke_endpoint().await;
    GoogleTokenRevoker::with_endpoint(&endpoint).revoke("ya29.live");

    for _ in 0..100 {
        if !hits.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*hits.lock().unwrap(), vec![("POST".to_owned(), Some("token=ya29.live".to_owned()))]);
}
