//! Error types for the room layer.

use potsync_protocol::{ErrorKind, PlayerId, ProtocolError, RoomId};
use potsync_store::StoreError;

/// Errors that can occur while applying an intent to a room.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No snapshot exists for the room.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The player is not a member of the room.
    #[error("player {0} not found in room {1}")]
    PlayerNotFound(PlayerId, RoomId),

    /// The room is at capacity and the joiner is not already a member.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player tried to bet more than they hold.
    #[error("insufficient chips: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    /// Bet amounts must be positive.
    #[error("invalid amount {0}: must be greater than zero")]
    InvalidAmount(i64),

    /// Nothing to take.
    #[error("pot in room {0} is empty")]
    EmptyPot(RoomId),

    /// A chip balance or the pot would exceed `u64::MAX`.
    #[error("chip total overflow in room {0}")]
    ChipOverflow(RoomId),

    /// Strict creation found an existing snapshot.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The snapshot store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A snapshot could not be encoded for storage.
    #[error("snapshot encoding failed: {0}")]
    Codec(#[from] ProtocolError),
}

impl RoomError {
    /// The category reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) => ErrorKind::RoomNotFound,
            Self::PlayerNotFound(..) => ErrorKind::PlayerNotFound,
            Self::RoomFull(_) => ErrorKind::RoomFull,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InvalidAmount(_) | Self::ChipOverflow(_) => {
                ErrorKind::InvalidAmount
            }
            Self::EmptyPot(_) => ErrorKind::EmptyPot,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Store(_) | Self::Codec(_) => ErrorKind::StoreUnavailable,
        }
    }
}
