//! Auth event fan-out and owned subscription handles.
//!
//! ARCHITECTURE
//! ============
//! `AuthEventHub` is the single publish point for backend auth events.
//! Every subscriber gets its own broadcast receiver drained by its own
//! task, so one slow handler never blocks another. Ordering *between*
//! subscribers is not guaranteed; each subscriber sees events in publish
//! order.
//!
//! `Subscription` owns that task through a cancel signal. Releasing it
//! (explicitly or on drop) stops delivery exactly once.

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::runtime::{MaybeSend, spawn_detached};
use crate::types::AuthEvent;

pub const DEFAULT_HUB_CAPACITY: usize = 64;

/// Broadcast point for backend auth events.
#[derive(Clone, Debug)]
pub struct AuthEventHub {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEventHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every live subscriber. Returns how many received it.
    pub fn publish(&self, event: AuthEvent) -> usize {
        debug!(event = %event.kind, has_session = event.session.is_some(), "auth event published");
        self.tx.send(event).unwrap_or(0)
    }

    /// Raw receiver; prefer [`Subscription::spawn`] for handler-style use.
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthEventHub {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_CAPACITY)
    }
}

/// Owned registration of an event handler. Must be held for as long as
/// events should be delivered.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: Uuid,
    cancel: Option<oneshot::Sender<()>>,
    running: Arc<AtomicBool>,
}

impl Subscription {
    /// Drive `handler` for every event arriving on `rx`, in order, on a
    /// detached task (tokio natively, the page event loop in the browser).
    pub fn spawn<F, Fut>(mut rx: broadcast::Receiver<AuthEvent>, mut handler: F) -> Self
    where
        F: FnMut(AuthEvent) -> Fut + MaybeSend + 'static,
        Fut: Future<Output = ()> + MaybeSend + 'static,
    {
        let id = Uuid::new_v4();
        let (cancel, mut cancelled) = oneshot::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let task = async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancelled => break,
                    recv = rx.recv() => match recv {
                        Ok(event) => handler(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(%id, skipped, "auth subscriber lagged; events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!(%id, "auth event stream closed");
                            break;
                        }
                    },
                }
            }
            flag.store(false, Ordering::SeqCst);
        };

        if spawn_detached(task) {
            debug!(%id, "auth subscription registered");
        } else {
            running.store(false, Ordering::SeqCst);
            warn!(%id, "no executor available; auth subscription inactive");
        }
        Self { id, cancel: Some(cancel), running }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the handler task is still receiving events.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some() && self.running.load(Ordering::SeqCst)
    }

    /// Stop delivery. Consumes the handle, so it can only happen once.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The task may already have exited on a closed stream.
            let _ = cancel.send(());
            debug!(id = %self.id, "auth subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
