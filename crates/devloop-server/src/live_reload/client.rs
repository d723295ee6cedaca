//! Reload client lifecycle.
//!
//! A reload client is one browser session holding the reload stream open.
//! Its lifecycle is an explicit state machine:
//!
//! ```text
//! Connecting ──open()──► Open ──close()/drop──► Closed
//!      └───────────────close()/drop────────────────┘
//! ```
//!
//! The client is registered with the [`ReloadBroadcaster`] on entering `Open`
//! and unregistered on entering `Closed`. Any transport can take part by
//! implementing [`ReloadSink`].

use std::sync::Arc;

use super::broadcaster::{ClientId, ReloadBroadcaster};

/// Failure to push a message to one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The client's transport buffer is full.
    #[error("client buffer is full")]
    Full,
    /// The client's transport has gone away.
    #[error("client connection is closed")]
    Closed,
}

/// Outgoing side of a reload transport.
///
/// `push` must not block: a transport that cannot accept the message right
/// now fails fast and the client is dropped.
pub trait ReloadSink: Send {
    /// Push one message to the client.
    fn push(&self, message: &'static str) -> Result<(), DeliveryError>;
}

/// Lifecycle state of a reload client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Request accepted, stream not yet registered.
    Connecting,
    /// Registered and receiving notifications.
    Open,
    /// Unregistered; terminal.
    Closed,
}

/// One connected reload client.
///
/// Dropping the client closes it, so tying its lifetime to the response body
/// unregisters it when the connection terminates.
pub struct ReloadClient {
    id: ClientId,
    state: ClientState,
    broadcaster: Arc<ReloadBroadcaster>,
}

impl ReloadClient {
    /// Start a new client in the `Connecting` state.
    #[must_use]
    pub fn connect(broadcaster: Arc<ReloadBroadcaster>) -> Self {
        Self {
            id: broadcaster.next_client_id(),
            state: ClientState::Connecting,
            broadcaster,
        }
    }

    /// Client handle used by the registry.
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Transition `Connecting -> Open`, registering `sink`.
    ///
    /// Has no effect in any other state.
    pub fn open(&mut self, sink: Box<dyn ReloadSink>) {
        if self.state != ClientState::Connecting {
            return;
        }
        self.broadcaster.register(self.id, sink);
        self.state = ClientState::Open;
        tracing::debug!(client = self.id, "Reload client connected");
    }

    /// Transition to `Closed` from any state, unregistering the client.
    pub fn close(&mut self) {
        if self.state == ClientState::Closed {
            return;
        }
        self.broadcaster.unregister(self.id);
        self.state = ClientState::Closed;
        tracing::debug!(client = self.id, "Reload client disconnected");
    }
}

impl Drop for ReloadClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;

    impl ReloadSink for NullSink {
        fn push(&self, _message: &'static str) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[test]
    fn test_lifecycle_registers_and_unregisters() {
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let mut client = ReloadClient::connect(Arc::clone(&broadcaster));

        assert_eq!(client.state(), ClientState::Connecting);
        assert_eq!(broadcaster.client_count(), 0);

        client.open(Box::new(NullSink));
        assert_eq!(client.state(), ClientState::Open);
        assert_eq!(broadcaster.client_count(), 1);

        client.close();
        assert_eq!(client.state(), ClientState::Closed);
        assert_eq!(broadcaster.client_count(), 0);
    }

    #[test]
    fn test_drop_closes_open_client() {
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let mut client = ReloadClient::connect(Arc::clone(&broadcaster));
        client.open(Box::new(NullSink));

        drop(client);

        assert_eq!(broadcaster.client_count(), 0);
    }

    #[test]
    fn test_close_from_connecting() {
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let mut client = ReloadClient::connect(Arc::clone(&broadcaster));

        client.close();

        assert_eq!(client.state(), ClientState::Closed);
        assert_eq!(broadcaster.client_count(), 0);
    }

    #[test]
    fn test_open_after_close_is_ignored() {
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let mut client = ReloadClient::connect(Arc::clone(&broadcaster));
        client.close();

        client.open(Box::new(NullSink));

        assert_eq!(client.state(), ClientState::Closed);
        assert_eq!(broadcaster.client_count(), 0);
    }

    #[test]
    fn test_clients_get_distinct_ids() {
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let a = ReloadClient::connect(Arc::clone(&broadcaster));
        let b = ReloadClient::connect(Arc::clone(&broadcaster));

        assert_ne!(a.id(), b.id());
    }
}
