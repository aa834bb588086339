//! Core protocol types: room snapshots and the messages around them.

use std::fmt;

use chrono::{DateTime, Utc};
use potsync_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Caller-supplied, stable identifier for a player.
///
/// The client picks it, so a reconnecting browser tab can rejoin as the same
/// player. Serialized as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-chosen name of a room. Also the store key suffix.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// One seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identity supplied by the client.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Chip balance. Unsigned, so it can never go negative.
    pub chips: u64,
    /// Connection currently representing this player. Used only to address
    /// broadcasts; the player does not own the connection.
    pub connection_id: ConnectionId,
}

/// The complete shared state of a room. This is the snapshot that gets
/// stored and broadcast; there are no partial updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// The room's name.
    pub id: RoomId,
    /// Members in join order, unique by [`Player::id`].
    pub players: Vec<Player>,
    /// Chips currently in the shared pot.
    pub pot: u64,
    /// When the room was first created.
    pub created_at: DateTime<Utc>,
    /// Maximum number of members.
    pub max_players: usize,
}

impl Room {
    /// Creates an empty room stamped with the current time.
    pub fn new(id: RoomId, max_players: usize) -> Self {
        Self {
            id,
            players: Vec::new(),
            pot: 0,
            created_at: Utc::now(),
            max_players,
        }
    }

    /// Looks up a member by ID.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Looks up a member by ID for mutation.
    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// Returns `true` if `id` is a member.
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Returns `true` when no further distinct player can join.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Returns `true` when the room has no members.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Sum of every member's chips plus the pot.
    ///
    /// Deposits and pot takes only move chips around, so this value is
    /// unchanged by them.
    pub fn total_chips(&self) -> u128 {
        u128::from(self.pot)
            + self.players.iter().map(|p| u128::from(p.chips)).sum::<u128>()
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A client request to change room state.
///
/// Internally tagged, so a bet looks like:
/// `{ "type": "ManualBet", "room_id": "r1", "player_id": "p1", "amount": 50 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    /// Join (or rejoin) a room, creating it if needed.
    JoinRoom {
        room_id: RoomId,
        player_id: PlayerId,
        player_name: String,
        /// Falls back to the server's configured default when omitted.
        #[serde(default)]
        starting_chips: Option<u64>,
    },

    /// Leave a room.
    LeaveRoom {
        room_id: RoomId,
        player_id: PlayerId,
    },

    /// Move chips from a player into the pot.
    ///
    /// Signed so that non-positive amounts reach the engine and are
    /// rejected as `InvalidAmount` rather than failing to decode.
    ManualBet {
        room_id: RoomId,
        player_id: PlayerId,
        amount: i64,
    },

    /// Move the whole pot to a player.
    TakePot {
        room_id: RoomId,
        player_id: PlayerId,
    },
}

impl Intent {
    /// The room this intent targets.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::LeaveRoom { room_id, .. }
            | Self::ManualBet { room_id, .. }
            | Self::TakePot { room_id, .. } => room_id,
        }
    }

    /// The player this intent acts for.
    pub fn player_id(&self) -> &PlayerId {
        match self {
            Self::JoinRoom { player_id, .. }
            | Self::LeaveRoom { player_id, .. }
            | Self::ManualBet { player_id, .. }
            | Self::TakePot { player_id, .. } => player_id,
        }
    }
}

/// Category of a failed intent, as reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    RoomNotFound,
    PlayerNotFound,
    RoomFull,
    InsufficientFunds,
    InvalidAmount,
    EmptyPot,
    StoreUnavailable,
    AlreadyExists,
    /// The frame could not be decoded or is not a client message.
    BadRequest,
}

/// Messages the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Sent only to the connection that joined.
    RoomJoined { room: Room, player_id: PlayerId },

    /// Full post-mutation snapshot, sent to room members.
    RoomUpdated { room: Room },

    /// Sent only to the connection whose intent failed.
    Error { kind: ErrorKind, message: String },
}

/// Connection-level housekeeping, independent of any room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client reply to [`SystemMessage::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Either direction: the sender is going away.
    Disconnect { reason: String },
}

/// Content of an [`Envelope`].
///
/// Adjacently tagged: `{ "type": "Intent", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    System(SystemMessage),
    Intent(Intent),
    Event(ServerEvent),
}

/// The top-level frame. Every message on the wire is an Envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,

    pub payload: Payload,
}
