//! Wire protocol for potsync.
//!
//! This crate defines what travels between clients, the server, and the
//! store:
//!
//! - **Snapshots** ([`Room`], [`Player`]): the canonical shared ledger.
//!   The same record is broadcast to clients and persisted in the store.
//! - **Messages** ([`Envelope`], [`Intent`], [`ServerEvent`],
//!   [`SystemMessage`]): what clients ask for and what they are told.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages and snapshots
//!   become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Engine (Intent → Room)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use potsync_transport::ConnectionId;
pub use types::{
    Envelope, ErrorKind, Intent, Payload, Player, PlayerId, Room, RoomId,
    ServerEvent, SystemMessage,
};
