use super::*;
use crate::test_helpers::session_for;

#[test]
fn auth_changed_event_name() {
    let event = AppEvent::AuthChanged { session: session_for("u1", "a@x.io", None) };
    assert_eq!(event.name(), "inflow:auth-changed");
}

#[test]
fn dispatch_without_listeners_is_silent() {
    let bus = LocalBus::new();
    bus.dispatch(AppEvent::AuthChanged { session: session_for("u1", "a@x.io", None) });
}

#[tokio::test]
async fn listener_receives_session_payload() {
    let bus = LocalBus::new();
    let mut rx = bus.listen();
    let session = session_for("u1", "a@x.io", Some("ada"));
    bus.dispatch(AppEvent::AuthChanged { session: session.clone() });

    let AppEvent::AuthChanged { session: got } = rx.recv().await.unwrap();
    assert_eq!(got, session);
}

#[test]
fn global_bus_is_shared() {
    let a = LocalBus::global();
    let b = LocalBus::global();
    assert!(std::ptr::eq(a, b));
}
