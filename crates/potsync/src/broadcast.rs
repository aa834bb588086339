//! Outbound delivery from the engine to live connections.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use potsync_protocol::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;

/// Receiving end a connection task drains to write events to its socket.
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Delivers server events to individual connections.
///
/// `send` must not block: the engine calls it while holding a room lock.
pub trait Broadcaster: Send + Sync + 'static {
    /// Queues `event` for `conn`. Returns `false` if the connection is
    /// gone; the event is dropped.
    fn send(&self, conn: ConnectionId, event: ServerEvent) -> bool;
}

/// The default [`Broadcaster`]: one unbounded channel per connection.
///
/// A connection task calls [`register`](Self::register) when it starts
/// and [`unregister`](Self::unregister) when it ends.
#[derive(Default)]
pub struct ConnectionHub {
    outboxes: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ConnectionHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an outbox for `conn` and returns its receiving end.
    ///
    /// Registering the same connection again replaces its outbox.
    pub fn register(&self, conn: ConnectionId) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes().insert(conn, tx);
        rx
    }

    /// Closes the outbox for `conn`. Returns `true` if one was open.
    pub fn unregister(&self, conn: ConnectionId) -> bool {
        self.outboxes().remove(&conn).is_some()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.outboxes().len()
    }

    /// Returns `true` if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn outboxes(
        &self,
    ) -> MutexGuard<'_, HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>
    {
        self.outboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Broadcaster for ConnectionHub {
    fn send(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        match self.outboxes().get(&conn) {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                tracing::debug!(%conn, "dropping event for unknown connection");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use potsync_protocol::ErrorKind;

    use super::*;

    fn event(message: &str) -> ServerEvent {
        ServerEvent::Error {
            kind: ErrorKind::BadRequest,
            message: message.into(),
        }
    }

    #[test]
    fn test_registered_connection_receives_event() {
        let hub = ConnectionHub::new();
        let mut rx = hub.register(ConnectionId::new(1));

        assert!(hub.send(ConnectionId::new(1), event("hi")));
        assert_eq!(rx.try_recv().unwrap(), event("hi"));
    }

    #[test]
    fn test_send_to_unknown_connection_returns_false() {
        let hub = ConnectionHub::new();
        assert!(!hub.send(ConnectionId::new(5), event("lost")));
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let hub = ConnectionHub::new();
        let _rx = hub.register(ConnectionId::new(1));

        assert!(hub.unregister(ConnectionId::new(1)));
        assert!(!hub.unregister(ConnectionId::new(1)));
        assert!(!hub.send(ConnectionId::new(1), event("late")));
        assert!(hub.is_empty());
    }

    #[test]
    fn test_dropped_receiver_reports_failed_send() {
        let hub = ConnectionHub::new();
        drop(hub.register(ConnectionId::new(1)));

        assert!(!hub.send(ConnectionId::new(1), event("nobody home")));
        assert_eq!(hub.len(), 1);
    }
}
