//! Room state management for potsync.
//!
//! # Key types
//!
//! - [`RoomRepository`]: loads and stores whole [`Room`](potsync_protocol::Room)
//!   snapshots through a [`Store`](potsync_store::Store)
//! - [`ledger`]: the only functions that change a snapshot's membership,
//!   chips, or pot
//! - [`RoomLocks`]: one mutual-exclusion domain per room ID
//! - [`RoomConfig`]: capacity, expiry, and default chips
//! - [`RoomError`]: everything an intent can fail with

mod config;
mod error;
pub mod ledger;
mod lock;
mod repository;

pub use config::RoomConfig;
pub use error::RoomError;
pub use ledger::Upsert;
pub use lock::{RoomGuard, RoomLocks};
pub use repository::RoomRepository;
