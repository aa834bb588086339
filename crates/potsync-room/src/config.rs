//! Room configuration.

use std::time::Duration;

/// Settings shared by every room a server hosts.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum distinct players per room.
    pub max_players: usize,

    /// How long an untouched snapshot survives in the store. Every write
    /// restarts the window.
    pub room_ttl: Duration,

    /// Chips given to a joining player who doesn't ask for a specific
    /// amount.
    pub starting_chips: u64,

    /// Prepended to the room ID to form the store key.
    pub key_prefix: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 10,
            room_ttl: Duration::from_secs(24 * 60 * 60),
            starting_chips: 1000,
            key_prefix: "room:".to_string(),
        }
    }
}
