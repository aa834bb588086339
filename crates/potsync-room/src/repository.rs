//! Room repository: whole-snapshot persistence on top of a [`Store`].

use std::time::Duration;

use potsync_protocol::{Codec, JsonCodec, Room, RoomId};
use potsync_store::{Store, StoreError};

use crate::{RoomConfig, RoomError};

/// Maps room IDs to stored [`Room`] snapshots.
///
/// There are no field-level updates: callers read a snapshot, change it,
/// and write the whole thing back. That sequence is only safe while the
/// caller holds the room's [`RoomGuard`](crate::RoomGuard).
pub struct RoomRepository<S: Store, C: Codec = JsonCodec> {
    store: S,
    codec: C,
    ttl: Duration,
    key_prefix: String,
}

impl<S: Store> RoomRepository<S> {
    /// Creates a repository that stores JSON snapshots.
    pub fn new(store: S, config: &RoomConfig) -> Self {
        Self::with_codec(store, JsonCodec, config)
    }
}

impl<S: Store, C: Codec> RoomRepository<S, C> {
    /// Creates a repository with a custom snapshot codec.
    pub fn with_codec(store: S, codec: C, config: &RoomConfig) -> Self {
        Self {
            store,
            codec,
            ttl: config.room_ttl,
            key_prefix: config.key_prefix.clone(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The store key for a room.
    pub fn key(&self, room_id: &RoomId) -> String {
        format!("{}{}", self.key_prefix, room_id)
    }

    /// Reads the current snapshot.
    ///
    /// Returns `Ok(None)` if the room was never created, was deleted, or
    /// expired.
    pub async fn get(&self, room_id: &RoomId) -> Result<Option<Room>, RoomError> {
        let key = self.key(room_id);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let room = self.codec.decode(&bytes).map_err(|e| StoreError::Corrupt {
            key,
            reason: e.to_string(),
        })?;
        Ok(Some(room))
    }

    /// Creates and persists an empty room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyExists`] if a snapshot is already stored.
    pub async fn create(
        &self,
        room_id: &RoomId,
        max_players: usize,
    ) -> Result<Room, RoomError> {
        if self.get(room_id).await?.is_some() {
            return Err(RoomError::AlreadyExists(room_id.clone()));
        }
        let room = Room::new(room_id.clone(), max_players);
        self.put(&room).await?;
        tracing::info!(%room_id, max_players, "room created");
        Ok(room)
    }

    /// Returns the stored room, or a fresh empty one that is NOT yet
    /// persisted.
    ///
    /// The caller seats the first player and then calls [`put`](Self::put),
    /// so an empty room never reaches the store.
    pub async fn fetch_or_new(
        &self,
        room_id: &RoomId,
        max_players: usize,
    ) -> Result<Room, RoomError> {
        match self.get(room_id).await? {
            Some(room) => Ok(room),
            None => {
                tracing::debug!(%room_id, "room not stored, starting fresh");
                Ok(Room::new(room_id.clone(), max_players))
            }
        }
    }

    /// Persists the full snapshot and restarts its expiry window.
    pub async fn put(&self, room: &Room) -> Result<(), RoomError> {
        let bytes = self.codec.encode(room)?;
        self.store.set(&self.key(&room.id), bytes, self.ttl).await?;
        Ok(())
    }

    /// Removes the stored snapshot. Returns `true` if one existed.
    pub async fn delete(&self, room_id: &RoomId) -> Result<bool, RoomError> {
        let removed = self.store.delete(&self.key(room_id)).await?;
        tracing::info!(%room_id, "room deleted");
        Ok(removed)
    }
}
