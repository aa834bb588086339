//! The synchronization engine: applies intents to rooms and fans out the
//! resulting snapshots.
//!
//! Every mutation follows the same shape while holding the room's lock:
//!
//! ```text
//! lock(room) → read snapshot → ledger rule → write snapshot → broadcast
//! ```
//!
//! A failure at any step before the write leaves the stored room and the
//! connection registry untouched. Broadcasting never waits on the network,
//! so holding the lock across it only orders the pushes.

use potsync_protocol::{ConnectionId, Intent, Player, PlayerId, Room, RoomId, ServerEvent};
use potsync_room::{RoomConfig, RoomError, RoomLocks, RoomRepository, Upsert, ledger};
use potsync_session::{Binding, ConnectionRegistry};
use potsync_store::Store;
use tokio::sync::Mutex;

use crate::broadcast::{Broadcaster, ConnectionHub};

/// What happened when a player was taken out of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The player left; the remaining members got this snapshot.
    Left(Room),
    /// The player was the last member and the room was deleted.
    Closed,
    /// The room does not exist or the player is not in it.
    Absent,
    /// The player is now represented by a different connection, so the
    /// stale connection's disconnect does not remove them.
    Superseded,
}

/// Applies client intents to shared rooms.
///
/// `Send + Sync`; share one instance across connection tasks with `Arc`.
pub struct SyncEngine<S: Store, B: Broadcaster = ConnectionHub> {
    repo: RoomRepository<S>,
    locks: RoomLocks,
    registry: Mutex<ConnectionRegistry>,
    broadcaster: B,
    config: RoomConfig,
}

impl<S: Store, B: Broadcaster> SyncEngine<S, B> {
    /// Creates an engine over `store` that delivers events through
    /// `broadcaster`.
    pub fn new(store: S, broadcaster: B, config: RoomConfig) -> Self {
        Self {
            repo: RoomRepository::new(store, &config),
            locks: RoomLocks::new(),
            registry: Mutex::new(ConnectionRegistry::new()),
            broadcaster,
            config,
        }
    }

    /// The outbound event sink.
    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    /// The room repository.
    pub fn repository(&self) -> &RoomRepository<S> {
        &self.repo
    }

    /// The room settings this engine was built with.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Reads the current snapshot of a room without locking it.
    pub async fn room(&self, room_id: &RoomId) -> Result<Option<Room>, RoomError> {
        self.repo.get(room_id).await
    }

    /// The (room, player) `conn` is currently bound to.
    pub async fn binding(&self, conn: ConnectionId) -> Option<Binding> {
        self.registry.lock().await.lookup(conn).cloned()
    }

    /// Dispatches one intent from `conn`.
    ///
    /// Successful intents produce their own events. A failed intent is
    /// reported to `conn` alone as [`ServerEvent::Error`]; other members
    /// see nothing.
    pub async fn handle(&self, conn: ConnectionId, intent: Intent) {
        let result = match intent {
            Intent::JoinRoom {
                room_id,
                player_id,
                player_name,
                starting_chips,
            } => self
                .join(conn, room_id, player_id, player_name, starting_chips)
                .await
                .map(drop),
            Intent::LeaveRoom { room_id, player_id } => {
                self.leave(conn, &room_id, &player_id).await.map(drop)
            }
            Intent::ManualBet {
                room_id,
                player_id,
                amount,
            } => self.deposit(&room_id, &player_id, amount).await.map(drop),
            Intent::TakePot { room_id, player_id } => {
                self.take_pot(&room_id, &player_id).await.map(drop)
            }
        };

        if let Err(e) = result {
            let kind = e.kind();
            match e {
                RoomError::Store(_) | RoomError::Codec(_) => {
                    tracing::warn!(%conn, error = %e, "intent failed");
                }
                _ => tracing::debug!(%conn, ?kind, error = %e, "intent rejected"),
            }
            self.broadcaster.send(
                conn,
                ServerEvent::Error {
                    kind,
                    message: e.to_string(),
                },
            );
        }
    }

    /// Seats `player_id` in `room_id`, creating the room if needed.
    ///
    /// A player already in the room is replaced in place with the new name,
    /// chips, and connection. The joiner receives
    /// [`ServerEvent::RoomJoined`]; every other member receives
    /// [`ServerEvent::RoomUpdated`]. `starting_chips` falls back to
    /// [`RoomConfig::starting_chips`].
    ///
    /// If `conn` was bound to a different membership, that membership is
    /// left once the join has been stored.
    pub async fn join(
        &self,
        conn: ConnectionId,
        room_id: RoomId,
        player_id: PlayerId,
        player_name: String,
        starting_chips: Option<u64>,
    ) -> Result<Room, RoomError> {
        let (room, previous) = {
            let _guard = self.locks.lock(&room_id).await;

            let mut room =
                self.repo.fetch_or_new(&room_id, self.config.max_players).await?;
            let player = Player {
                id: player_id.clone(),
                name: player_name,
                chips: starting_chips.unwrap_or(self.config.starting_chips),
                connection_id: conn,
            };
            let outcome = ledger::upsert_player(&mut room, player)?;
            self.repo.put(&room).await?;

            let previous = self
                .registry
                .lock()
                .await
                .bind(conn, room_id.clone(), player_id.clone());

            self.broadcaster.send(
                conn,
                ServerEvent::RoomJoined {
                    room: room.clone(),
                    player_id: player_id.clone(),
                },
            );
            self.broadcast(&room, Some(conn));

            match outcome {
                Upsert::Joined => tracing::info!(
                    %conn, %room_id, %player_id,
                    members = room.players.len(),
                    "player joined"
                ),
                Upsert::Rejoined => {
                    tracing::info!(%conn, %room_id, %player_id, "player rejoined")
                }
            }
            (room, previous)
        };

        if let Some(previous) = previous {
            if previous.room_id != room_id || previous.player_id != player_id {
                self.leave_stale(conn, &previous).await;
            }
        }
        Ok(room)
    }

    /// Removes `player_id` from `room_id`.
    ///
    /// The last member out deletes the room and nobody is notified;
    /// otherwise the remaining members receive the new snapshot. Leaving a
    /// room that does not exist, or one the player is not in, changes
    /// nothing. `conn`'s binding is dropped if it pointed at this
    /// membership.
    pub async fn leave(
        &self,
        conn: ConnectionId,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<Departure, RoomError> {
        let departure = self.remove_player(room_id, player_id, None).await?;

        let mut registry = self.registry.lock().await;
        let bound_here = registry
            .lookup(conn)
            .is_some_and(|b| &b.room_id == room_id && &b.player_id == player_id);
        if bound_here {
            registry.unbind(conn);
        }
        Ok(departure)
    }

    /// Moves `amount` chips from the player into the pot.
    ///
    /// # Errors
    /// `RoomNotFound`, `PlayerNotFound`, `InvalidAmount` for `amount <= 0`,
    /// and `InsufficientFunds`, checked in that order.
    pub async fn deposit(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        amount: i64,
    ) -> Result<Room, RoomError> {
        let (room, pot) = self
            .mutate(room_id, |room| ledger::deposit(room, player_id, amount))
            .await?;
        tracing::info!(%room_id, %player_id, amount, pot, "chips deposited");
        Ok(room)
    }

    /// Moves the whole pot to the player.
    ///
    /// # Errors
    /// `RoomNotFound`, `PlayerNotFound`, and `EmptyPot`, checked in that
    /// order.
    pub async fn take_pot(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<Room, RoomError> {
        let (room, taken) = self
            .mutate(room_id, |room| ledger::take_pot(room, player_id))
            .await?;
        tracing::info!(%room_id, %player_id, taken, "pot taken");
        Ok(room)
    }

    /// Cleans up after a connection that went away.
    ///
    /// The binding is always dropped first, even if the leave that follows
    /// fails. If the bound player has since been taken over by another
    /// connection they stay in the room. Returns `Ok(None)` when `conn`
    /// was not bound, so calling this twice is harmless.
    pub async fn disconnect(
        &self,
        conn: ConnectionId,
    ) -> Result<Option<Departure>, RoomError> {
        let Some(binding) = self.registry.lock().await.unbind(conn) else {
            return Ok(None);
        };
        let departure = self
            .remove_player(&binding.room_id, &binding.player_id, Some(conn))
            .await?;
        tracing::info!(
            %conn,
            room_id = %binding.room_id,
            player_id = %binding.player_id,
            ?departure,
            "connection cleaned up"
        );
        Ok(Some(departure))
    }

    /// Runs `apply` against the stored room under its lock, then writes and
    /// broadcasts the result.
    async fn mutate<T>(
        &self,
        room_id: &RoomId,
        apply: impl FnOnce(&mut Room) -> Result<T, RoomError>,
    ) -> Result<(Room, T), RoomError> {
        let _guard = self.locks.lock(room_id).await;

        let mut room = self
            .repo
            .get(room_id)
            .await?
            .ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))?;
        let out = apply(&mut room)?;
        self.repo.put(&room).await?;
        self.broadcast(&room, None);
        Ok((room, out))
    }

    /// Takes a player out of a room under its lock.
    ///
    /// With `owner` set, the player is only removed while their seat still
    /// belongs to that connection.
    async fn remove_player(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        owner: Option<ConnectionId>,
    ) -> Result<Departure, RoomError> {
        let _guard = self.locks.lock(room_id).await;

        let Some(mut room) = self.repo.get(room_id).await? else {
            return Ok(Departure::Absent);
        };
        if let Some(owner) = owner {
            let taken_over = room
                .player(player_id)
                .is_some_and(|p| p.connection_id != owner);
            if taken_over {
                return Ok(Departure::Superseded);
            }
        }
        if ledger::remove_player(&mut room, player_id).is_none() {
            return Ok(Departure::Absent);
        }

        if room.is_empty() {
            self.repo.delete(room_id).await?;
            tracing::info!(%room_id, %player_id, "last player left, room closed");
            return Ok(Departure::Closed);
        }
        self.repo.put(&room).await?;
        self.broadcast(&room, None);
        tracing::info!(%room_id, %player_id, members = room.players.len(), "player left");
        Ok(Departure::Left(room))
    }

    /// Leaves the membership a connection held before it joined elsewhere.
    async fn leave_stale(&self, conn: ConnectionId, previous: &Binding) {
        let result = self
            .remove_player(&previous.room_id, &previous.player_id, Some(conn))
            .await;
        if let Err(e) = result {
            tracing::warn!(
                %conn,
                room_id = %previous.room_id,
                player_id = %previous.player_id,
                error = %e,
                "failed to leave previous room"
            );
        }
    }

    /// Pushes the full snapshot to every member's connection, except
    /// `except`. Each connection is addressed once.
    fn broadcast(&self, room: &Room, except: Option<ConnectionId>) {
        let mut targets: Vec<ConnectionId> = room
            .players
            .iter()
            .map(|p| p.connection_id)
            .filter(|c| Some(*c) != except)
            .collect();
        targets.sort_unstable();
        targets.dedup();

        for conn in targets {
            let delivered = self
                .broadcaster
                .send(conn, ServerEvent::RoomUpdated { room: room.clone() });
            if !delivered {
                tracing::debug!(%conn, room_id = %room.id, "broadcast target gone");
            }
        }
    }
}
