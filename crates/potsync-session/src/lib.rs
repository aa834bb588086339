//! Connection bindings for potsync.
//!
//! A transport only knows that a connection went away. This crate keeps
//! the process-local record of which room and player each live connection
//! stands for, so an abrupt disconnect can be turned into a leave.
//!
//! ```text
//! Engine (above)     ← binds on join, unbinds on leave/disconnect
//!     ↕
//! Session (this crate) ← ConnectionId → (RoomId, PlayerId)
//!     ↕
//! Protocol (below)   ← provides the ID types
//! ```

mod registry;

pub use registry::{Binding, ConnectionRegistry};
