//! Process-wide local event bus.
//!
//! Decoupled listeners (UI widgets, analytics, caches) observe auth changes
//! here without holding a reference to the backend. Dispatch is
//! fire-and-forget: no listeners is not an error.

#[cfg(test)]
#[path = "bus_test.rs"]
mod tests;

use std::sync::OnceLock;

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::Session;

/// Name of the event emitted after an authenticated session is observed.
pub const AUTH_CHANGED_EVENT: &str = "inflow:auth-changed";

const BUS_CAPACITY: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub enum AppEvent {
    AuthChanged { session: Session },
}

impl AppEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthChanged { .. } => AUTH_CHANGED_EVENT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocalBus {
    tx: broadcast::Sender<AppEvent>,
}

impl LocalBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// The shared instance for this process.
    pub fn global() -> &'static LocalBus {
        static GLOBAL: OnceLock<LocalBus> = OnceLock::new();
        GLOBAL.get_or_init(LocalBus::new)
    }

    pub fn dispatch(&self, event: AppEvent) {
        let name = event.name();
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(event = name, delivered, "local event dispatched");
    }

    #[must_use]
    pub fn listen(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}
