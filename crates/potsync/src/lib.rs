//! # Potsync
//!
//! Real-time shared chip ledgers for small groups.
//!
//! Clients connect over WebSocket, join a named room, and move chips
//! between their own balance and a shared pot. Every accepted change is
//! stored as a whole room snapshot and pushed to every member, so all
//! clients converge on the same view.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use potsync::prelude::*;
//!
//! # async fn run() -> Result<(), PotsyncError> {
//! let server = PotsyncServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .health_bind("0.0.0.0:8081")
//!     .build(MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod broadcast;
mod engine;
mod error;
mod handler;
pub mod health;
mod server;

pub use broadcast::{Broadcaster, ConnectionHub, EventReceiver};
pub use engine::{Departure, SyncEngine};
pub use error::PotsyncError;
pub use server::{
    DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, PotsyncServer, PotsyncServerBuilder,
};

/// Convenience re-exports for building and talking to a potsync server.
pub mod prelude {
    pub use crate::{
        Broadcaster, ConnectionHub, Departure, PotsyncError, PotsyncServer,
        PotsyncServerBuilder, SyncEngine,
    };

    pub use potsync_protocol::{
        Codec, Envelope, ErrorKind, Intent, JsonCodec, Payload, Player,
        PlayerId, Room, RoomId, ServerEvent, SystemMessage,
    };
    pub use potsync_room::{RoomConfig, RoomError};
    pub use potsync_session::Binding;
    pub use potsync_store::{MemoryStore, Store, StoreError};
    pub use potsync_transport::ConnectionId;
}
