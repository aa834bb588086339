//! Snapshot storage for potsync.
//!
//! Rooms are persisted as opaque blobs under string keys, each with a
//! time-to-live. The [`Store`] trait is the only thing the room layer
//! depends on, so an external key-value service can replace
//! [`MemoryStore`] without touching the engine.

#![allow(async_fn_in_trait)]

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use std::future::Future;
use std::time::Duration;

/// Keyed blob storage with per-entry expiry.
///
/// Methods return `Send` futures so callers can hold a store inside state
/// shared across spawned tasks.
pub trait Store: Send + Sync + 'static {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key was never written, was deleted, or
    /// has expired.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Writes `value` under `key`, replacing any previous value and
    /// restarting its expiry window at `ttl`.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes `key`. Returns `true` if a live value was removed.
    fn delete(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Drops every expired entry and returns how many were removed.
    ///
    /// Backends that evict expired keys on their own keep the default.
    fn purge_expired(
        &self,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send {
        async { Ok(0) }
    }
}
