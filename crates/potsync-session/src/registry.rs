//! The connection registry.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain `HashMap` with no locking. The engine
//! owns one instance behind a mutex; only the owning connection's own
//! events ever touch its entry, so there is no cross-entry contention to
//! design for.

use std::collections::HashMap;

use potsync_protocol::{ConnectionId, PlayerId, RoomId};

/// What a live connection represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

/// Maps live connections to the (room, player) they joined as.
///
/// Entries exist only while the connection is open and are never
/// persisted.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: HashMap<ConnectionId, Binding>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `conn` now represents `player_id` in `room_id`.
    ///
    /// A connection holds at most one binding. The binding it replaced,
    /// if any, is returned so the caller can clean up the old membership.
    pub fn bind(
        &mut self,
        conn: ConnectionId,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Option<Binding> {
        tracing::debug!(%conn, %room_id, %player_id, "connection bound");
        self.bindings.insert(conn, Binding { room_id, player_id })
    }

    /// Removes and returns the binding for `conn`.
    ///
    /// Returns `None` if the connection never joined or was already
    /// unbound; calling this twice is harmless.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<Binding> {
        let removed = self.bindings.remove(&conn);
        if removed.is_some() {
            tracing::debug!(%conn, "connection unbound");
        }
        removed
    }

    /// Returns the binding for `conn`, if any.
    pub fn lookup(&self, conn: ConnectionId) -> Option<&Binding> {
        self.bindings.get(&conn)
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no connection is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
