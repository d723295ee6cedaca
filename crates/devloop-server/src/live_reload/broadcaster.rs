//! Reload broadcaster.
//!
//! Owns the registry of connected reload clients and pushes the reload
//! message to all of them. A failed push removes that one client and never
//! affects delivery to the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::client::ReloadSink;

/// Message pushed to every client after a successful rebuild.
pub const RELOAD_MESSAGE: &str = "reload";

/// Registry handle of a reload client.
pub type ClientId = u64;

/// Registry of reload clients.
#[derive(Default)]
pub struct ReloadBroadcaster {
    clients: Mutex<HashMap<ClientId, Box<dyn ReloadSink>>>,
    next_id: AtomicU64,
}

impl ReloadBroadcaster {
    /// Create an empty broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for a new client.
    pub fn next_client_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a client. Registering an existing handle replaces its sink.
    pub fn register(&self, id: ClientId, sink: Box<dyn ReloadSink>) {
        self.lock().insert(id, sink);
    }

    /// Remove a client. Returns whether it was registered.
    pub fn unregister(&self, id: ClientId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Push the reload message to every registered client.
    ///
    /// Clients whose push fails are removed. Returns the number of clients
    /// that accepted the message.
    pub fn notify_reload(&self) -> usize {
        let mut clients = self.lock();
        let before = clients.len();

        clients.retain(|id, sink| match sink.push(RELOAD_MESSAGE) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(client = *id, error = %err, "Dropping reload client");
                false
            }
        });

        let delivered = clients.len();
        if delivered < before {
            tracing::debug!(dropped = before - delivered, "Removed unreachable reload clients");
        }
        delivered
    }

    /// Drop every client, ending their streams.
    pub fn disconnect_all(&self) {
        self.lock().clear();
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ClientId) -> bool {
        self.lock().contains_key(&id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, Box<dyn ReloadSink>>> {
        // A poisoned registry is still a valid map
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
